// Drill logic, history and persistence; the TUI lives in the binary.
pub mod app_dirs;
pub mod config;
pub mod history;
pub mod keymap;
pub mod problem;
pub mod round;
pub mod round_log;
pub mod runtime;
pub mod saver;
pub mod session;
pub mod stats;
pub mod store;
pub mod util;
