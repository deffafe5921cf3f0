//! Commands Layer
//!
//! Command handlers that bridge a UI host to the shelf store.

mod shelf_cmd;

pub use shelf_cmd::*;
