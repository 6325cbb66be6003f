//! Persistent per-file job records.
//!
//! One `JobRecord` per source file says which parts are done, where their
//! output went and how many segments each recognized. It is rewritten after
//! every completed part, so a crash loses at most the part in progress.
//! Two backends: a single JSON document replaced atomically, or a SQLite
//! table keyed by file.

mod json;
mod sqlite;
mod store;
mod types;

pub use json::JsonCheckpointStore;
pub use sqlite::SqliteCheckpointStore;
pub use store::{open_store, CheckpointStore};
pub use types::*;
