//! Output formatting for CLI.

mod json;
mod progress;

pub use json::write_json;
pub use progress::TrainingProgress;
