// Library surface for headless/integration tests and reuse.
// Terminal and widget code stays in the binary (main.rs, ui/).
pub mod app_dirs;
pub mod board;
pub mod config;
pub mod geometry;
pub mod interaction;
pub mod logging;
pub mod runtime;
pub mod store;
pub mod timeline;
