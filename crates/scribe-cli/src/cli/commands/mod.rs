//! CLI command handlers, one per file.

mod repair;
mod run;
mod status;

pub use repair::run_repair;
pub use run::run_transcribe;
pub use status::run_status;
