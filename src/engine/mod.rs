//! Engine Layer
//!
//! Pure reconciliation logic over the in-memory stores: row/column resizing
//! and drop placement. Nothing here persists or logs above `debug`.

pub mod placement;
pub mod resize;

pub use placement::{Placement, SlotRef};
pub use resize::{GridLimits, ResizeReport};
