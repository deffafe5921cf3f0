//! Store Layer
//!
//! In-memory collections and the persisted shelf facade built on them.

mod grid_store;
mod item_store;
mod shelf;


pub use grid_store::GridStore;
pub use item_store::ItemStore;
pub use shelf::{DropResult, ShelfSnapshot, ShelfStore};
