//! Item Entity
//!
//! A placed book, notebook, recipe, album or sticker.
//! Each item belongs to exactly one grid and one linear position in it.

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::grid::GridId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant of `ItemPayload`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Book,
    Notebook,
    Recipe,
    Album,
    Sticker,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Book => "book",
            ItemKind::Notebook => "notebook",
            ItemKind::Recipe => "recipe",
            ItemKind::Album => "album",
            ItemKind::Sticker => "sticker",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Encoded cover image (data URL)
    #[serde(default)]
    pub cover: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub title: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub pages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

/// Placement of a sticker image inside its slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StickerTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl Default for StickerTransform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    /// Encoded image or animation (data URL)
    pub image: String,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub transform: StickerTransform,
}

/// Item content, discriminated by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemPayload {
    Book(Book),
    Notebook(Notebook),
    Recipe(Recipe),
    Album(Album),
    Sticker(Sticker),
}

impl ItemPayload {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemPayload::Book(_) => ItemKind::Book,
            ItemPayload::Notebook(_) => ItemKind::Notebook,
            ItemPayload::Recipe(_) => ItemKind::Recipe,
            ItemPayload::Album(_) => ItemKind::Album,
            ItemPayload::Sticker(_) => ItemKind::Sticker,
        }
    }

    pub fn book(title: &str) -> Self {
        ItemPayload::Book(Book {
            title: title.to_string(),
            author: None,
            cover: None,
        })
    }

    pub fn sticker(image: &str) -> Self {
        ItemPayload::Sticker(Sticker {
            image: image.to_string(),
            animated: false,
            transform: StickerTransform::default(),
        })
    }
}

/// A placed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub grid_id: GridId,
    /// Linear index into the grid; stale while hidden
    pub position: usize,
    #[serde(default)]
    pub hidden: bool,
    /// Position the item was hidden from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_position: Option<usize>,
    /// Grid width when `original_position` was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_columns: Option<usize>,
    pub payload: ItemPayload,
}

impl Item {
    pub fn new(id: ItemId, grid_id: GridId, position: usize, payload: ItemPayload) -> Self {
        Self {
            id,
            grid_id,
            position,
            hidden: false,
            original_position: None,
            original_columns: None,
            payload,
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.payload.kind()
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Visible and sitting on `(grid_id, position)`
    pub fn occupies(&self, grid_id: GridId, position: usize) -> bool {
        !self.hidden && self.grid_id == grid_id && self.position == position
    }

    /// Park the item, remembering where it was shown
    pub fn hide(&mut self, columns: usize) {
        self.original_position = Some(self.position);
        self.original_columns = Some(columns);
        self.hidden = true;
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Where a new item goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Slot {
    /// First position with no visible item
    FirstEmpty,
    At(usize),
}

/// Fields for a new item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    pub grid_id: GridId,
    pub slot: Slot,
    pub payload: ItemPayload,
}

/// Partial item update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub grid_id: Option<GridId>,
    pub position: Option<usize>,
    pub hidden: Option<bool>,
    pub payload: Option<ItemPayload>,
}
