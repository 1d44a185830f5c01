//! Database access layer for pcs-calc

mod call_history;

pub use call_history::{CallHistoryStore, SqliteCallHistoryStore};
