//! CLI command handlers. Each command is in its own file.

mod classify;
mod config;
mod schedule;
mod simulate;

pub use classify::run_classify;
pub use config::run_config;
pub use schedule::run_schedule;
pub use simulate::{run_simulate, simulate, Scripted};
