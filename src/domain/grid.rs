//! Grid Entity
//!
//! A grid is a named shelf of `rows x columns` slots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity::Entity;
use super::item::ItemKind;
use super::position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridId(pub u32);

impl std::fmt::Display for GridId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Grid kind determines which items may be placed on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    #[default]
    Book,
    Notebook,
    Recipe,
    Music,
}

impl GridKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridKind::Book => "book",
            GridKind::Notebook => "notebook",
            GridKind::Recipe => "recipe",
            GridKind::Music => "music",
        }
    }

    /// Stickers go anywhere, everything else must match the shelf
    pub fn accepts(&self, kind: ItemKind) -> bool {
        matches!(
            (self, kind),
            (_, ItemKind::Sticker)
                | (GridKind::Book, ItemKind::Book)
                | (GridKind::Notebook, ItemKind::Notebook)
                | (GridKind::Recipe, ItemKind::Recipe)
                | (GridKind::Music, ItemKind::Album)
        )
    }
}

/// A shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub id: GridId,
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub kind: GridKind,
    /// Styling attributes, passed through unchanged
    #[serde(default)]
    pub style: Map<String, Value>,
}

impl Grid {
    pub fn new(id: GridId, name: String, rows: usize, columns: usize, kind: GridKind) -> Self {
        Self {
            id,
            name,
            rows,
            columns,
            kind,
            style: Map::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        position::capacity(self.rows, self.columns)
    }

    pub fn contains(&self, position: usize) -> bool {
        position < self.capacity()
    }
}

impl Entity for Grid {
    type Id = GridId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Fields for a new grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub kind: GridKind,
    #[serde(default)]
    pub style: Map<String, Value>,
}

/// Partial grid update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPatch {
    pub name: Option<String>,
    pub kind: Option<GridKind>,
    pub style: Option<Map<String, Value>>,
    /// Routed through the resize engine
    pub rows: Option<usize>,
    /// Routed through the resize engine
    pub columns: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_capacity() {
        let grid = Grid::new(GridId(1), "Shelf".to_string(), 2, 4, GridKind::Book);
        assert_eq!(grid.id(), GridId(1));
        assert_eq!(grid.capacity(), 8);
        assert!(grid.contains(7));
        assert!(!grid.contains(8));
    }

    #[test]
    fn test_kind_policy() {
        assert!(GridKind::Book.accepts(ItemKind::Book));
        assert!(GridKind::Book.accepts(ItemKind::Sticker));
        assert!(!GridKind::Book.accepts(ItemKind::Recipe));
        assert!(GridKind::Music.accepts(ItemKind::Album));
        assert!(GridKind::Recipe.accepts(ItemKind::Sticker));
    }

    #[test]
    fn test_grid_serialization() {
        let grid = Grid::new(GridId(3), "Cookbooks".to_string(), 1, 5, GridKind::Recipe);
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["kind"], "recipe");

        // style and kind are optional in stored records
        let restored: Grid =
            serde_json::from_str(r#"{"id":3,"name":"Old","rows":2,"columns":2}"#).unwrap();
        assert_eq!(restored.kind, GridKind::Book);
        assert!(restored.style.is_empty());
    }
}
