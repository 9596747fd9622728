use std::cell::RefCell;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{
    self, Event as CtEvent, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind,
};
use tracing::warn;

/// Unified event type consumed by the planning loop
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
}

impl PlanEvent {
    /// Keep the terminal events the planner reacts to. Key releases and
    /// repeats, focus changes and pastes are dropped.
    pub fn from_terminal(event: CtEvent) -> Option<PlanEvent> {
        match event {
            CtEvent::Key(key) if key.kind == KeyEventKind::Press => Some(PlanEvent::Key(key)),
            CtEvent::Mouse(mouse) => Some(PlanEvent::Mouse(mouse)),
            CtEvent::Resize(_, _) => Some(PlanEvent::Resize),
            _ => None,
        }
    }

    fn motion(&self) -> Option<MouseEventKind> {
        match self {
            PlanEvent::Mouse(m) => match m.kind {
                MouseEventKind::Moved | MouseEventKind::Drag(_) => Some(m.kind),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Source of terminal events (keyboard, mouse, resize)
pub trait PlanEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<PlanEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread
pub struct CrosstermEventSource {
    rx: Receiver<PlanEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(evt) => match PlanEvent::from_terminal(evt) {
                    Some(evt) => evt,
                    None => continue,
                },
                Err(e) => {
                    warn!(error = %e, "terminal event reader stopped");
                    break;
                }
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlanEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Scripted event source for headless sessions
pub struct TestEventSource {
    rx: Receiver<PlanEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PlanEvent>) -> Self {
        Self { rx }
    }

    /// A source plus the sender that feeds it
    pub fn channel() -> (Sender<PlanEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl PlanEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PlanEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Hands the loop one event at a time, or a Tick when the ticker interval
/// passes quietly.
///
/// A burst of identical pointer motion collapses into its last position so
/// a fast drag costs one reducer pass per step rather than one per cell.
pub struct Runner<E: PlanEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    pending: RefCell<Option<PlanEvent>>,
}

impl<E: PlanEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
            pending: RefCell::new(None),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.ticker.interval()
    }

    pub fn step(&self) -> PlanEvent {
        if let Some(evt) = self.pending.borrow_mut().take() {
            return evt;
        }

        let first = match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(evt) => evt,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return PlanEvent::Tick
            }
        };
        let Some(kind) = first.motion() else {
            return first;
        };

        let mut latest = first;
        while let Ok(next) = self.event_source.recv_timeout(Duration::ZERO) {
            if next.motion() == Some(kind) {
                latest = next;
            } else {
                *self.pending.borrow_mut() = Some(next);
                break;
            }
        }
        latest
    }
}
