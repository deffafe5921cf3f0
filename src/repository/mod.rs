//! Repository Layer
//!
//! Key-value storage abstraction and implementations.

mod db;
mod memory;
mod traits;

pub use db::{init_db, SqliteStorage};
pub use memory::MemoryStorage;
pub use traits::{StorageAdapter, UsageStats};
