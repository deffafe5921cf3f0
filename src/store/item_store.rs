//! Item Store
//!
//! In-memory collection of placed items.
//! Central invariant: at most one visible item per `(grid_id, position)`.

use std::collections::HashSet;

use crate::domain::{
    CapacityError, DomainError, DomainResult, Grid, GridId, Item, ItemId, ItemPatch, ItemPayload,
    Slot,
};

use super::grid_store::GridStore;

#[derive(Debug, Clone)]
pub struct ItemStore {
    items: Vec<Item>,
    /// `None` once every id has been handed out
    next_id: Option<u32>,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_id: Some(1),
        }
    }

    pub fn from_items(items: Vec<Item>) -> Self {
        let next_id = match items.iter().map(|i| i.id.0).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        if next_id.is_none() {
            log::warn!("stored item ids are exhausted, new items will be refused");
        }
        Self { items, next_id }
    }

    /// Never hand out `id` or anything below it
    pub fn reserve_ids(&mut self, id: u32) {
        self.next_id = match (self.next_id, id.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
    }

    pub fn list(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    /// Engines work on the whole slice and filter by grid themselves
    pub(crate) fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    pub fn for_grid(&self, grid_id: GridId) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |i| i.grid_id == grid_id)
    }

    /// Visible item on a slot, if any
    pub fn find_by_position(&self, grid_id: GridId, position: usize) -> Option<&Item> {
        self.items.iter().find(|i| i.occupies(grid_id, position))
    }

    /// First slot of `grid` with no visible item
    pub fn first_empty(&self, grid: &Grid) -> Option<usize> {
        let occupied: HashSet<usize> = self
            .for_grid(grid.id)
            .filter(|i| i.is_visible())
            .map(|i| i.position)
            .collect();
        (0..grid.capacity()).find(|p| !occupied.contains(p))
    }

    /// Place a new item on `grid`
    pub fn add(&mut self, grid: &Grid, slot: Slot, payload: ItemPayload) -> DomainResult<ItemId> {
        let kind = payload.kind();
        if !grid.kind.accepts(kind) {
            return Err(DomainError::InvalidInput(format!(
                "A {} cannot be placed on a {} shelf",
                kind.as_str(),
                grid.kind.as_str()
            )));
        }

        let position = match slot {
            Slot::FirstEmpty => self.first_empty(grid).ok_or(CapacityError::GridFull)?,
            Slot::At(position) => {
                if !grid.contains(position) {
                    return Err(DomainError::InvalidInput(format!(
                        "Slot {} is outside the shelf",
                        position
                    )));
                }
                if self.find_by_position(grid.id, position).is_some() {
                    return Err(DomainError::Conflict(format!(
                        "Slot {} is already occupied",
                        position
                    )));
                }
                position
            }
        };

        let raw = self
            .next_id
            .ok_or_else(|| DomainError::Internal("No item ids left".into()))?;
        let id = ItemId(raw);
        self.next_id = raw.checked_add(1);
        self.items.push(Item::new(id, grid.id, position, payload));
        Ok(id)
    }

    /// Shallow-merge `patch` into an item.
    /// The merged item is validated before anything is written.
    pub fn update(&mut self, id: ItemId, patch: ItemPatch, grids: &GridStore) -> DomainResult<()> {
        let current = self
            .get(id)
            .ok_or_else(|| DomainError::NotFound(format!("Item {}", id)))?;

        let mut next = current.clone();
        if let Some(grid_id) = patch.grid_id {
            next.grid_id = grid_id;
        }
        if let Some(position) = patch.position {
            next.position = position;
        }
        if let Some(payload) = patch.payload {
            next.payload = payload;
        }

        let grid = grids.require(next.grid_id)?;
        match patch.hidden {
            Some(true) if !current.hidden => next.hide(grid.columns),
            Some(hidden) => next.hidden = hidden,
            None => {}
        }

        if !grid.kind.accepts(next.kind()) {
            return Err(DomainError::InvalidInput(format!(
                "A {} cannot be placed on a {} shelf",
                next.kind().as_str(),
                grid.kind.as_str()
            )));
        }
        if next.is_visible() {
            if !grid.contains(next.position) {
                return Err(DomainError::InvalidInput(format!(
                    "Slot {} is outside the shelf",
                    next.position
                )));
            }
            if let Some(other) = self.find_by_position(next.grid_id, next.position) {
                if other.id != id {
                    return Err(DomainError::Conflict(format!(
                        "Slot {} is already occupied",
                        next.position
                    )));
                }
            }
        }

        if let Some(slot) = self.get_mut(id) {
            *slot = next;
        }
        Ok(())
    }

    /// Remove an item; `None` if it did not exist
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }

    /// Remove every item of a grid
    pub fn remove_grid(&mut self, grid_id: GridId) -> Vec<ItemId> {
        let removed = self
            .items
            .iter()
            .filter(|i| i.grid_id == grid_id)
            .map(|i| i.id)
            .collect();
        self.items.retain(|i| i.grid_id != grid_id);
        removed
    }

    /// Every visible item sits on a distinct slot
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for item in self.items.iter().filter(|i| i.is_visible()) {
            if !seen.insert((item.grid_id, item.position)) {
                return Err(format!(
                    "Two visible items on grid {} position {}",
                    item.grid_id, item.position
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GridKind, GridSpec};
    use crate::engine::resize::GridLimits;

    fn setup(rows: usize, columns: usize) -> (GridStore, GridId) {
        let mut grids = GridStore::new();
        let id = grids
            .create(
                GridSpec {
                    name: "Shelf".into(),
                    rows,
                    columns,
                    kind: GridKind::Book,
                    style: Default::default(),
                },
                &GridLimits::default(),
            )
            .unwrap();
        (grids, id)
    }

    #[test]
    fn test_add_first_empty_fills_gaps() {
        let (grids, gid) = setup(2, 2);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();

        items.add(grid, Slot::At(0), ItemPayload::book("A")).unwrap();
        items.add(grid, Slot::At(2), ItemPayload::book("B")).unwrap();
        let id = items.add(grid, Slot::FirstEmpty, ItemPayload::book("C")).unwrap();

        assert_eq!(items.get(id).unwrap().position, 1);
    }

    #[test]
    fn test_add_to_full_grid_fails() {
        let (grids, gid) = setup(1, 1);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();
        let existing = items.add(grid, Slot::FirstEmpty, ItemPayload::book("A")).unwrap();
        let before = items.get(existing).cloned();

        let result = items.add(grid, Slot::FirstEmpty, ItemPayload::book("B"));
        assert_eq!(result, Err(DomainError::Capacity(CapacityError::GridFull)));
        assert_eq!(items.len(), 1);
        assert_eq!(items.get(existing).cloned(), before);
    }

    #[test]
    fn test_id_overflow_refuses_instead_of_wrapping() {
        let (grids, gid) = setup(1, 2);
        let grid = grids.get(gid).unwrap();
        let top = Item::new(ItemId(u32::MAX), gid, 0, ItemPayload::book("Top"));
        let mut items = ItemStore::from_items(vec![top]);

        assert!(matches!(
            items.add(grid, Slot::FirstEmpty, ItemPayload::book("Next")),
            Err(DomainError::Internal(_))
        ));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_hidden_items_do_not_occupy() {
        let (grids, gid) = setup(1, 2);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();
        let id = items.add(grid, Slot::At(0), ItemPayload::book("A")).unwrap();
        items.get_mut(id).unwrap().hide(2);

        assert!(items.find_by_position(gid, 0).is_none());
        assert_eq!(items.first_empty(grid), Some(0));
        let other = items.add(grid, Slot::At(0), ItemPayload::book("B")).unwrap();
        assert_eq!(items.find_by_position(gid, 0).unwrap().id, other);
        assert!(items.check_invariants().is_ok());
    }

    #[test]
    fn test_add_rejects_wrong_kind_and_occupied_slot() {
        let (grids, gid) = setup(1, 2);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();
        items.add(grid, Slot::At(0), ItemPayload::book("A")).unwrap();

        let recipe = ItemPayload::Recipe(crate::domain::Recipe {
            title: "Soup".into(),
            ingredients: vec![],
            instructions: None,
            image: None,
        });
        assert!(matches!(
            items.add(grid, Slot::At(1), recipe),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            items.add(grid, Slot::At(0), ItemPayload::book("B")),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            items.add(grid, Slot::At(5), ItemPayload::book("B")),
            Err(DomainError::InvalidInput(_))
        ));
        // stickers go anywhere
        assert!(items.add(grid, Slot::At(1), ItemPayload::sticker("x")).is_ok());
    }

    #[test]
    fn test_update_refuses_collision() {
        let (grids, gid) = setup(1, 3);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();
        let a = items.add(grid, Slot::At(0), ItemPayload::book("A")).unwrap();
        items.add(grid, Slot::At(1), ItemPayload::book("B")).unwrap();

        let patch = ItemPatch {
            position: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            items.update(a, patch, &grids),
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(items.get(a).unwrap().position, 0);

        let patch = ItemPatch {
            position: Some(2),
            payload: Some(ItemPayload::book("A, second edition")),
            ..Default::default()
        };
        items.update(a, patch, &grids).unwrap();
        assert_eq!(items.get(a).unwrap().position, 2);
        assert!(items.check_invariants().is_ok());
    }

    #[test]
    fn test_update_hide_records_origin() {
        let (grids, gid) = setup(1, 3);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();
        let a = items.add(grid, Slot::At(2), ItemPayload::book("A")).unwrap();

        let patch = ItemPatch {
            hidden: Some(true),
            ..Default::default()
        };
        items.update(a, patch, &grids).unwrap();
        let item = items.get(a).unwrap();
        assert!(item.hidden);
        assert_eq!(item.original_position, Some(2));
        assert_eq!(item.original_columns, Some(3));
    }

    #[test]
    fn test_update_unknown_item() {
        let (grids, _) = setup(1, 1);
        let mut items = ItemStore::new();
        assert!(matches!(
            items.update(ItemId(42), ItemPatch::default(), &grids),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (grids, gid) = setup(1, 2);
        let grid = grids.get(gid).unwrap();
        let mut items = ItemStore::new();
        let a = items.add(grid, Slot::At(0), ItemPayload::book("A")).unwrap();

        assert!(items.remove(ItemId(99)).is_none());
        assert_eq!(items.len(), 1);
        assert!(items.remove(a).is_some());
        assert!(items.remove(a).is_none());
        assert!(items.is_empty());
    }
}
