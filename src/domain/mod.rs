//! Domain Layer
//!
//! Contains all domain entities and core abstractions.
//! This layer has NO external dependencies (except serde and serde_json for serialization).

mod entity;
mod grid;
mod item;
pub mod position;

pub use entity::{CapacityError, DomainError, DomainResult, Entity};
pub use grid::{Grid, GridId, GridKind, GridPatch, GridSpec};
pub use item::{
    Album, Book, Item, ItemId, ItemKind, ItemPatch, ItemPayload, ItemSpec, Notebook, Recipe,
    Slot, Sticker, StickerTransform,
};
pub use position::Cell;
