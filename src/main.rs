pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::Rect,
    Frame, Terminal,
};
use roundplan::{
    app_dirs::AppDirs,
    board::{BoardError, BoardState},
    config::{Config, ConfigStore, FileConfigStore},
    geometry::Point,
    interaction::{Interaction, PointerEvent},
    logging,
    runtime::{CrosstermEventSource, FixedTicker, PlanEvent, PlanEventSource, Runner, Ticker},
    store::{Store, Subscription},
    timeline::TimelineState,
};
use std::{
    cell::Cell,
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    rc::Rc,
    time::{Duration, Instant},
};
use tracing::info;

use crate::ui::{board_view::cell_to_map, screen::current_screen, timeline_view::ratio_at_column};

const TICK_RATE_MS: u64 = 50;

/// plan timed movement paths on a tactical map
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Place markers on a map, draw timed movement paths for each of them and scrub the round timeline to see where everyone stands at any moment."
)]
pub struct Cli {
    /// seconds in one round
    #[clap(short = 'r', long)]
    round_duration: Option<f64>,

    /// map width in pixel units
    #[clap(long)]
    map_width: Option<f64>,

    /// map height in pixel units
    #[clap(long)]
    map_height: Option<f64>,

    /// cursor movement per arrow key press
    #[clap(long)]
    cursor_step: Option<f64>,

    /// round seconds played back per second
    #[clap(long)]
    playback_speed: Option<f64>,

    /// config file to read instead of the default location
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// keyboard only, leave the mouse to the terminal
    #[clap(long)]
    no_mouse: bool,
}

impl Cli {
    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    /// Command line values win over the config file
    fn apply_to(&self, cfg: Config) -> Config {
        Config {
            round_duration: self.round_duration.unwrap_or(cfg.round_duration),
            map_width: self.map_width.unwrap_or(cfg.map_width),
            map_height: self.map_height.unwrap_or(cfg.map_height),
            cursor_step: self.cursor_step.unwrap_or(cfg.cursor_step),
            playback_speed: self.playback_speed.unwrap_or(cfg.playback_speed),
            ..cfg
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Planning,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub struct App {
    pub config: Config,
    pub store: Store,
    pub interaction: Interaction,
    pub cursor: Point,
    pub timeline: TimelineState,
    pub state: AppState,
    /// where the map and ruler were last drawn, for mouse mapping
    pub board_area: Rect,
    pub timeline_area: Rect,
    pub status: Option<String>,
    redraw: Rc<Cell<bool>>,
    _subscription: Subscription,
}

impl App {
    pub fn new(config: Config) -> Result<Self, BoardError> {
        let store = Store::new(BoardState::new(config.round_duration)?);

        let redraw = Rc::new(Cell::new(true));
        let flag = Rc::clone(&redraw);
        let subscription = store.subscribe(move |_| flag.set(true));

        Ok(Self {
            cursor: Point::new(config.map_width / 2.0, config.map_height / 2.0),
            config,
            store,
            interaction: Interaction::default(),
            timeline: TimelineState::default(),
            state: AppState::Planning,
            board_area: Rect::default(),
            timeline_area: Rect::default(),
            status: None,
            redraw,
            _subscription: subscription,
        })
    }

    pub fn map_size(&self) -> (f64, f64) {
        (self.config.map_width, self.config.map_height)
    }

    pub fn request_redraw(&self) {
        self.redraw.set(true);
    }

    fn take_redraw(&self) -> bool {
        self.redraw.replace(false)
    }

    fn round_duration(&self) -> f64 {
        self.store.state().round_duration()
    }

    /// Run one pointer event through the interaction state machine
    pub fn pointer(&mut self, event: PointerEvent) {
        let radius = self.config.hit_radius;
        let (next, actions) = self.interaction.handle(self.store.state(), event, radius);
        if next != self.interaction {
            self.interaction = next;
            self.request_redraw();
        }

        if !matches!(event, PointerEvent::Move(_)) && self.status.take().is_some() {
            self.request_redraw();
        }
        for action in actions {
            if self.store.dispatch(action) {
                continue;
            }
            if let Some(rejection) = self.store.last_rejection().filter(|r| r.is_limit()) {
                self.status = Some(rejection.to_string());
                self.request_redraw();
            }
        }
    }

    fn move_cursor(&mut self, dx: f64, dy: f64) {
        let (w, h) = self.map_size();
        self.cursor = Point::new(
            (self.cursor.x + dx).clamp(0.0, w),
            (self.cursor.y + dy).clamp(0.0, h),
        );
        self.pointer(PointerEvent::Move(self.cursor));
    }

    /// Keyboard drag: the first press grabs, the second drops
    fn grab(&mut self) {
        match self.interaction {
            Interaction::DraggingMarker { .. } | Interaction::DraggingVertex { .. } => {
                self.pointer(PointerEvent::Release(self.cursor));
                self.pointer(PointerEvent::Click(self.cursor));
            }
            _ => self.pointer(PointerEvent::Press(self.cursor)),
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        // ctrl+c to quit from anywhere
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        let mut screen = current_screen(&self.state);
        if screen.on_key(key, self) {
            return Control::Continue;
        }

        let rd = self.round_duration();
        let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
            self.config.cursor_step * 3.0
        } else {
            self.config.cursor_step
        };

        match key.code {
            KeyCode::Char('q') => return Control::Quit,
            KeyCode::Char('?') => self.state = AppState::Help,
            KeyCode::Left => self.move_cursor(-step, 0.0),
            KeyCode::Right => self.move_cursor(step, 0.0),
            KeyCode::Up => self.move_cursor(0.0, -step),
            KeyCode::Down => self.move_cursor(0.0, step),
            KeyCode::Enter | KeyCode::Char(' ') => self.pointer(PointerEvent::Click(self.cursor)),
            KeyCode::Char('g') => self.grab(),
            KeyCode::Char('x') | KeyCode::Delete => self.pointer(PointerEvent::Erase(self.cursor)),
            KeyCode::Esc => self.pointer(PointerEvent::Cancel),
            KeyCode::Char('[') => self.timeline = self.timeline.nudge(-1.0, rd),
            KeyCode::Char(']') => self.timeline = self.timeline.nudge(1.0, rd),
            KeyCode::Char('{') => self.timeline = self.timeline.nudge(-5.0, rd),
            KeyCode::Char('}') => self.timeline = self.timeline.nudge(5.0, rd),
            KeyCode::Home => self.timeline = self.timeline.update_caret(0.0, 0.0),
            KeyCode::End => self.timeline = self.timeline.nudge(rd, rd),
            KeyCode::Char('p') => self.timeline = self.timeline.toggle_playback(rd),
            _ => return Control::Continue,
        }
        self.request_redraw();
        Control::Continue
    }

    pub fn on_mouse(&mut self, mouse: MouseEvent) {
        if self.state != AppState::Planning {
            return;
        }

        if let Some(ratio) = ratio_at_column(self.timeline_area, mouse.column, mouse.row) {
            if matches!(
                mouse.kind,
                MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left)
            ) {
                self.timeline = self.timeline.seek_ratio(ratio, self.round_duration());
                self.request_redraw();
            }
            return;
        }

        let Some(p) = cell_to_map(self.board_area, self.map_size(), mouse.column, mouse.row) else {
            return;
        };
        self.cursor = p;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.pointer(PointerEvent::Press(p)),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                self.pointer(PointerEvent::Move(p))
            }
            // a release is followed by the click it completes
            MouseEventKind::Up(MouseButton::Left) => {
                self.pointer(PointerEvent::Release(p));
                self.pointer(PointerEvent::Click(p));
            }
            MouseEventKind::Down(MouseButton::Right) => self.pointer(PointerEvent::Erase(p)),
            _ => {}
        }
        self.request_redraw();
    }

    pub fn on_tick(&mut self, dt: Duration) {
        if !self.timeline.playing {
            return;
        }
        self.timeline = self.timeline.tick(
            dt.as_secs_f64(),
            self.config.playback_speed,
            self.round_duration(),
        );
        self.request_redraw();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(path) = AppDirs::log_path() {
        if let Err(e) = logging::init(&path) {
            eprintln!("roundplan: logging disabled ({}): {e}", path.display());
        }
    }

    let config_store = cli.config_store();
    let config = cli.apply_to(config_store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e).exit();
    }
    if cli.save_config {
        config_store.save(&config)?;
        info!(path = %config_store.path().display(), "saved config");
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let mut app = App::new(config)?;
    info!(
        round_duration = app.round_duration(),
        map_width = app.config.map_width,
        map_height = app.config.map_height,
        "session started"
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if !cli.no_mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!(markers = app.store.state().marker_count(), "session ended");
    result
}

fn start_tui<B: Backend, E: PlanEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    let mut last_tick = Instant::now();

    loop {
        if app.take_redraw() {
            terminal.draw(|f| ui(app, f))?;
        }

        match runner.step() {
            PlanEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
            }
            PlanEvent::Mouse(mouse) => app.on_mouse(mouse),
            PlanEvent::Resize => app.request_redraw(),
            PlanEvent::Tick => {}
        }

        let now = Instant::now();
        app.on_tick(now.duration_since(last_tick));
        last_tick = now;
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    current_screen(&app.state).render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use ratatui::backend::TestBackend;
    use roundplan::{board::MarkerId, runtime::TestEventSource};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn app() -> App {
        App::new(Config::default()).unwrap()
    }

    /// Render once into an 80x24 test terminal so mouse areas are known
    fn rendered(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|f| ui(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["roundplan"]);

        assert_eq!(cli.round_duration, None);
        assert_eq!(cli.map_width, None);
        assert_eq!(cli.config, None);
        assert!(!cli.save_config);
        assert!(!cli.no_mouse);
        assert_eq!(cli.apply_to(Config::default()), Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "roundplan",
            "-r",
            "115",
            "--map-width",
            "2048",
            "--cursor-step",
            "30",
            "--no-mouse",
        ]);
        let file = Config {
            map_height: 900.0,
            ..Config::default()
        };

        let cfg = cli.apply_to(file);
        assert_eq!(cfg.round_duration, 115.0);
        assert_eq!(cfg.map_width, 2048.0);
        assert_eq!(cfg.map_height, 900.0);
        assert_eq!(cfg.cursor_step, 30.0);
        assert!(cli.no_mouse);
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["roundplan", "--config", "/tmp/plan.json", "--save-config"]);
        assert!(cli.save_config);
        assert_eq!(
            cli.config_store().path(),
            std::path::Path::new("/tmp/plan.json")
        );
    }

    #[test]
    fn test_app_starts_with_cursor_centered() {
        let app = app();
        assert_eq!(app.cursor, Point::new(512.0, 384.0));
        assert_eq!(app.state, AppState::Planning);
        assert_eq!(app.interaction, Interaction::Idle);
        assert_eq!(app.store.state().round_time(), 87.0);
    }

    #[test]
    fn test_app_rejects_bad_round_duration() {
        let cfg = Config {
            round_duration: 0.0,
            ..Config::default()
        };
        assert!(App::new(cfg).is_err());

        let cfg = Config {
            round_duration: 1e10,
            ..Config::default()
        };
        assert!(App::new(cfg).is_err());
    }

    #[test]
    fn test_keyboard_draws_a_path() {
        let mut app = app();
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.store.state().marker_count(), 1);

        app.on_key(key(KeyCode::Enter));
        assert_eq!(
            app.interaction,
            Interaction::Drawing {
                marker: MarkerId(1)
            }
        );

        for _ in 0..3 {
            app.on_key(key(KeyCode::Right));
        }
        let preview = *app.store.state().preview_line().unwrap();
        assert_eq!(preview.end(), Point::new(557.0, 384.0));

        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Esc));

        assert_eq!(app.interaction, Interaction::Idle);
        assert_eq!(app.store.state().preview_line(), None);
        let marker = app.store.state().marker(MarkerId(1)).unwrap();
        assert_eq!(marker.paths.len(), 1);
        assert_eq!(marker.time, 86.0);
    }

    #[test]
    fn test_keyboard_grab_moves_marker() {
        let mut app = app();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('g')));
        assert!(matches!(
            app.interaction,
            Interaction::DraggingMarker { .. }
        ));
        app.on_key(key(KeyCode::Down));
        app.on_key(key(KeyCode::Char('g')));

        // the drop swallowed the click, no drawing started
        assert_eq!(app.interaction, Interaction::Idle);
        let marker = app.store.state().marker(MarkerId(1)).unwrap();
        assert_eq!((marker.x, marker.y), (512.0, 399.0));
    }

    #[test]
    fn test_erase_key_removes_marker() {
        let mut app = app();
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('x')));
        assert_eq!(app.store.state().marker_count(), 0);
    }

    #[test]
    fn test_cursor_stays_on_map() {
        let mut app = app();
        for _ in 0..100 {
            app.on_key(KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT));
        }
        assert_eq!(app.cursor.x, 0.0);
    }

    #[test]
    fn test_timeline_keys() {
        let mut app = app();
        app.on_key(key(KeyCode::Char(']')));
        assert_eq!(app.timeline.caret_time, 1.0);
        app.on_key(key(KeyCode::Char('}')));
        assert_eq!(app.timeline.caret_time, 6.0);
        app.on_key(key(KeyCode::Char('[')));
        assert_eq!(app.timeline.caret_time, 5.0);
        app.on_key(key(KeyCode::End));
        assert_eq!(app.timeline.caret_time, 87.0);
        assert_eq!(app.timeline.caret_pos, 1.0);
        app.on_key(key(KeyCode::Home));
        assert_eq!(app.timeline.caret_time, 0.0);
    }

    #[test]
    fn test_playback_advances_on_tick() {
        let mut app = app();
        app.on_tick(Duration::from_secs(3));
        assert_eq!(app.timeline.caret_time, 0.0);

        app.on_key(key(KeyCode::Char('p')));
        assert!(app.timeline.playing);
        app.on_tick(Duration::from_secs(2));
        assert_eq!(app.timeline.caret_time, 2.0);

        app.on_key(key(KeyCode::Char('p')));
        app.on_tick(Duration::from_secs(2));
        assert_eq!(app.timeline.caret_time, 2.0);
    }

    #[test]
    fn test_help_screen_swallows_next_key() {
        let mut app = app();
        app.on_key(key(KeyCode::Char('?')));
        assert_eq!(app.state, AppState::Help);

        // q closes help instead of quitting
        assert_eq!(app.on_key(key(KeyCode::Char('q'))), Control::Continue);
        assert_eq!(app.state, AppState::Planning);
        assert_eq!(app.on_key(key(KeyCode::Char('q'))), Control::Quit);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = app();
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.on_key(ctrl_c), Control::Quit);
    }

    #[test]
    fn test_marker_cap_shows_status() {
        let mut app = app();
        for i in 0..10 {
            app.cursor = Point::new(50.0 * (i + 1) as f64, 50.0);
            app.on_key(key(KeyCode::Enter));
        }
        assert_eq!(app.status, None);

        app.cursor = Point::new(50.0, 600.0);
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.store.state().marker_count(), 10);
        assert_eq!(app.status.as_deref(), Some("marker cap of 10 reached"));

        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.status, None);
    }

    #[test]
    fn test_render_shows_round_and_status() {
        let mut app = app();
        let screen = rendered(&mut app);
        assert!(screen.contains("Round 1:27"));
        assert!(screen.contains("markers 0/10"));
        assert_eq!(app.board_area, Rect::new(1, 1, 78, 16));
        assert_eq!(app.timeline_area, Rect::new(1, 19, 78, 3));
    }

    #[test]
    fn test_render_help_overlay() {
        let mut app = app();
        app.state = AppState::Help;
        let screen = rendered(&mut app);
        assert!(screen.contains("Keys"));
        assert!(screen.contains("play / pause the round"));
    }

    #[test]
    fn test_mouse_click_and_erase() {
        let mut app = app();
        rendered(&mut app);

        app.on_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 40, 8));
        app.on_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 40, 8));
        assert_eq!(app.store.state().marker_count(), 1);
        let marker = app.store.state().marker(MarkerId(1)).unwrap();
        assert_eq!(marker.anchor(), app.cursor);

        app.on_mouse(mouse(MouseEventKind::Down(MouseButton::Right), 40, 8));
        assert_eq!(app.store.state().marker_count(), 0);
    }

    #[test]
    fn test_mouse_seeks_timeline() {
        let mut app = app();
        rendered(&mut app);

        app.on_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 78, 20));
        assert_eq!(app.timeline.caret_time, 87.0);
        app.on_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 1, 20));
        assert_eq!(app.timeline.caret_time, 0.0);
        // the map was not touched
        assert_eq!(app.store.state().marker_count(), 0);
    }

    #[test]
    fn test_mouse_ignored_outside_areas() {
        let mut app = app();
        rendered(&mut app);
        app.on_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 0, 0));
        app.on_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 0, 0));
        assert_eq!(app.store.state().marker_count(), 0);
    }

    #[test]
    fn test_start_tui_runs_until_quit() {
        let (tx, source) = TestEventSource::channel();
        tx.send(PlanEvent::Key(key(KeyCode::Enter))).unwrap();
        tx.send(PlanEvent::Resize).unwrap();
        tx.send(PlanEvent::Key(key(KeyCode::Char('q')))).unwrap();

        let runner = Runner::new(source, FixedTicker::new(Duration::from_millis(1)));
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut app = app();

        start_tui(&mut terminal, &mut app, &runner).unwrap();
        assert_eq!(app.store.state().marker_count(), 1);
        assert!(!app.take_redraw());
    }
}
