pub mod config;
pub mod logging;

pub mod checkpoint;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod parts;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod segment;
pub mod splitter;
pub mod storage;
