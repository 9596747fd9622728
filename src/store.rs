use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::board::{Action, BoardState, Rejection};

type Listener = Box<dyn FnMut(&BoardState)>;

struct Entry {
    active: Rc<Cell<bool>>,
    listener: Listener,
}

/// Keeps a listener registered until dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    active: Rc<Cell<bool>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.set(false);
    }
}

/// Single-writer holder of the current board snapshot.
///
/// Every dispatched action replaces the snapshot with the reducer's output;
/// listeners hear about it only when the snapshot actually changed.
pub struct Store {
    state: BoardState,
    last_rejection: Option<Rejection>,
    listeners: RefCell<Vec<Entry>>,
}

impl Store {
    pub fn new(state: BoardState) -> Self {
        Self {
            state,
            last_rejection: None,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    /// Why the most recent dispatch was rejected, if it was
    pub fn last_rejection(&self) -> Option<&Rejection> {
        self.last_rejection.as_ref()
    }

    /// Apply one action. Returns true when the snapshot changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        let next = match self.state.apply(&action) {
            Ok(next) => {
                self.last_rejection = None;
                next
            }
            Err(rejection) => {
                rejection.log(&action);
                self.last_rejection = Some(rejection);
                return false;
            }
        };
        if next == self.state {
            debug!(action = %action, "no change");
            return false;
        }

        debug!(
            action = %action,
            markers = next.marker_count(),
            round_time = next.round_time(),
            "dispatched"
        );
        self.state = next;
        self.notify();
        true
    }

    /// Apply actions in order, returning how many changed the snapshot
    pub fn dispatch_all(&mut self, actions: impl IntoIterator<Item = Action>) -> usize {
        actions
            .into_iter()
            .filter(|action| self.dispatch(*action))
            .count()
    }

    pub fn subscribe(&self, listener: impl FnMut(&BoardState) + 'static) -> Subscription {
        let active = Rc::new(Cell::new(true));
        self.listeners.borrow_mut().push(Entry {
            active: Rc::clone(&active),
            listener: Box::new(listener),
        });
        Subscription { active }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|e| e.active.get())
            .count()
    }

    fn notify(&mut self) {
        let listeners = self.listeners.get_mut();
        listeners.retain(|e| e.active.get());
        for entry in listeners.iter_mut() {
            (entry.listener)(&self.state);
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(BoardState::default())
    }
}
