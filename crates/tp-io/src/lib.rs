//! # tp-io
//!
//! The postgres-facing half of `target-postgres`: a thin connection
//! wrapper, schema/table introspection and evolution, the on-disk batch
//! spool with fingerprint dedup, and the staging-table merge protocol.

mod buffer;
mod db;
mod ident;
mod merge;
mod table;

pub use buffer::{BatchBuffer, CompletedBatch};
pub use db::DbAdapter;
pub use merge::Merger;
pub use table::TableManager;
