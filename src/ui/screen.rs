use crossterm::event::KeyEvent;
use ratatui::Frame;

use crate::{
    ui::{render_help, render_plan},
    App, AppState,
};

/// A UI Screen boundary: responsible for rendering and optional key handling
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
    /// Optional per-screen key handling. Returns true if the key was handled.
    fn on_key(&mut self, _key: KeyEvent, _app: &mut App) -> bool {
        false
    }
}

/// Planning screen - map, timeline and status bar
pub struct PlanScreen;

impl Screen for PlanScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_plan(app, f);
    }
}

/// Help screen - key bindings over the plan
pub struct HelpScreen;

impl Screen for HelpScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_plan(app, f);
        render_help(f);
    }

    fn on_key(&mut self, _key: KeyEvent, app: &mut App) -> bool {
        // any key closes the help overlay
        app.state = AppState::Planning;
        app.request_redraw();
        true
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Planning => Box::new(PlanScreen),
        AppState::Help => Box::new(HelpScreen),
    }
}
