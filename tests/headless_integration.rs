use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use roundplan::{
    board::MarkerId,
    geometry::Point,
    interaction::{Interaction, PointerEvent},
    runtime::{FixedTicker, PlanEvent, Runner, TestEventSource},
    store::Store,
    timeline::{positions_at, TimelineState},
};

const HIT_RADIUS: f64 = 12.0;
// one terminal cell covers 10x10 map units in these sessions
const CELL: f64 = 10.0;

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> PlanEvent {
    PlanEvent::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

fn click(column: u16, row: u16) -> [PlanEvent; 2] {
    [
        mouse(MouseEventKind::Down(MouseButton::Left), column, row),
        mouse(MouseEventKind::Up(MouseButton::Left), column, row),
    ]
}

/// Minimal planning loop over the library pieces, the way the binary wires them
struct Session {
    store: Store,
    interaction: Interaction,
    timeline: TimelineState,
}

impl Session {
    fn new() -> Self {
        Self {
            store: Store::default(),
            interaction: Interaction::Idle,
            timeline: TimelineState::default(),
        }
    }

    fn pointer(&mut self, event: PointerEvent) {
        let board = self.store.state();
        let (next, actions) = self.interaction.handle(board, event, HIT_RADIUS);
        self.store.dispatch_all(actions);
        self.interaction = next;
    }

    /// Returns false once the session should stop
    fn handle(&mut self, event: PlanEvent, tick: Duration) -> bool {
        let rd = self.store.state().round_duration();
        match event {
            PlanEvent::Key(key) => match key.code {
                KeyCode::Char('q') => return false,
                KeyCode::Char('p') => self.timeline = self.timeline.toggle_playback(rd),
                KeyCode::Esc => self.pointer(PointerEvent::Cancel),
                _ => {}
            },
            PlanEvent::Mouse(m) => {
                let p = Point::new(f64::from(m.column) * CELL, f64::from(m.row) * CELL);
                match m.kind {
                    MouseEventKind::Down(MouseButton::Left) => self.pointer(PointerEvent::Press(p)),
                    MouseEventKind::Up(MouseButton::Left) => {
                        self.pointer(PointerEvent::Release(p));
                        self.pointer(PointerEvent::Click(p));
                    }
                    MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                        self.pointer(PointerEvent::Move(p))
                    }
                    MouseEventKind::Down(MouseButton::Right) => {
                        self.pointer(PointerEvent::Erase(p))
                    }
                    _ => {}
                }
            }
            PlanEvent::Resize => {}
            PlanEvent::Tick => {
                self.timeline = self.timeline.tick(tick.as_secs_f64(), 1.0, rd);
            }
        }
        true
    }
}

fn run(session: &mut Session, events: Vec<PlanEvent>, max_steps: u32) {
    let (tx, rx) = mpsc::channel();
    for event in events {
        tx.send(event).unwrap();
    }

    let tick = Duration::from_millis(5);
    let runner = Runner::new(TestEventSource::new(rx), FixedTicker::new(tick));
    for _ in 0..max_steps {
        if !session.handle(runner.step(), tick) {
            break;
        }
    }
}

fn key(c: char) -> PlanEvent {
    PlanEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

#[test]
fn headless_drawing_session() {
    let mut session = Session::new();
    let mut events = Vec::new();
    // place a marker, select it, draw two legs, stop drawing
    events.extend(click(10, 10));
    events.extend(click(10, 10));
    events.push(mouse(MouseEventKind::Moved, 55, 10));
    events.extend(click(55, 10));
    events.push(mouse(MouseEventKind::Moved, 55, 37));
    events.extend(click(55, 37));
    events.push(PlanEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    events.push(key('q'));

    run(&mut session, events, 100);

    let board = session.store.state();
    let marker = board.marker(MarkerId(1)).unwrap();
    let times: Vec<f64> = marker.paths.iter().map(|p| p.time).collect();
    assert_eq!(times, vec![10.0, 16.0]);
    assert_eq!(marker.time, 71.0);
    assert_eq!(board.round_time(), 71.0);
    assert_eq!(board.preview_line(), None);
    assert_eq!(session.interaction, Interaction::Idle);
}

#[test]
fn headless_drag_vertex_and_erase() {
    let mut session = Session::new();
    let mut events = Vec::new();
    events.extend(click(0, 0));
    events.extend(click(0, 0));
    events.extend(click(45, 0));
    events.push(PlanEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    // drag the waypoint from (450, 0) to (900, 0)
    events.push(mouse(MouseEventKind::Down(MouseButton::Left), 45, 0));
    events.push(mouse(MouseEventKind::Drag(MouseButton::Left), 70, 0));
    events.push(mouse(MouseEventKind::Up(MouseButton::Left), 90, 0));
    events.push(key('q'));

    run(&mut session, events, 100);
    {
        let marker = session.store.state().marker(MarkerId(1)).unwrap();
        assert_eq!(marker.paths.len(), 1);
        assert_eq!(marker.paths[0].end(), Point::new(900.0, 0.0));
        assert_eq!(marker.time, 67.0);
    }

    // right click on the waypoint removes it
    let erase = mouse(MouseEventKind::Down(MouseButton::Right), 90, 0);
    run(&mut session, vec![erase, key('q')], 10);
    let marker = session.store.state().marker(MarkerId(1)).unwrap();
    assert!(marker.paths.is_empty());
    assert_eq!(marker.time, 87.0);
}

#[test]
fn headless_playback_moves_markers_along_their_paths() {
    let mut session = Session::new();
    let mut events = Vec::new();
    events.extend(click(0, 0));
    events.extend(click(0, 0));
    events.extend(click(90, 0));
    events.push(PlanEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    events.push(key('p'));
    run(&mut session, events, 10);
    assert!(session.timeline.playing);

    // with no more input every step is a tick
    run(&mut session, Vec::new(), 20);
    let elapsed = session.timeline.caret_time;
    assert!(elapsed > 0.0 && elapsed < 1.0, "elapsed {elapsed}");

    let positions = positions_at(session.store.state(), elapsed);
    let (id, p) = positions[0];
    assert_eq!(id, MarkerId(1));
    assert!(p.x > 0.0 && p.x < 900.0);
    assert_eq!(p.y, 0.0);
}
