//! Virtual Shelf Core
//!
//! Layered architecture:
//! - domain: Core entities, positions and business rules
//! - engine: Resize and drop-placement reconciliation
//! - store: In-memory collections and the persisted `ShelfStore`
//! - repository: Key-value storage abstractions and implementations
//! - commands: JSON command handlers for UI hosts

pub mod commands;
pub mod config;
pub mod domain;
pub mod engine;
pub mod notice;
pub mod repository;
pub mod store;

pub use commands::{dispatch, CommandResponse, ShelfCommand};
pub use config::ShelfConfig;
pub use notice::{Notice, NoticeLevel};
pub use repository::{MemoryStorage, SqliteStorage, StorageAdapter, UsageStats};
pub use store::ShelfStore;
