//! Placement Engine
//!
//! Drop-target resolution for drag-and-drop: move into an empty slot, swap with
//! the occupant, or nothing when an item is dropped on itself.
//! Resolution reads one snapshot of the stores; `apply` writes both sides of a
//! swap in one synchronous step.

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult, GridId, ItemId, ItemKind};
use crate::store::{GridStore, ItemStore};

/// A slot on a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRef {
    pub grid_id: GridId,
    pub position: usize,
}

impl SlotRef {
    pub fn new(grid_id: GridId, position: usize) -> Self {
        Self { grid_id, position }
    }
}

/// Computed drop action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Placement {
    /// Target was empty
    Move { item: ItemId, to: SlotRef },
    /// Target was occupied; the occupant takes the dragged item's old slot
    Swap {
        dragged: ItemId,
        dragged_to: SlotRef,
        displaced: ItemId,
        displaced_to: SlotRef,
    },
    /// Dropped on its own slot
    Stay { item: ItemId },
}

/// Work out what dropping `dragged` on `target` does
pub fn resolve_drop(
    grids: &GridStore,
    items: &ItemStore,
    dragged: ItemId,
    target: SlotRef,
) -> DomainResult<Placement> {
    let item = items
        .get(dragged)
        .filter(|i| i.is_visible())
        .ok_or_else(|| DomainError::NotFound(format!("Item {}", dragged)))?;
    let grid = grids.require(target.grid_id)?;
    if !grid.contains(target.position) {
        return Err(DomainError::NotFound(format!(
            "Slot {} on grid {}",
            target.position, target.grid_id
        )));
    }
    check_kind(grids, target.grid_id, item.kind())?;

    let origin = SlotRef::new(item.grid_id, item.position);
    match items.find_by_position(target.grid_id, target.position) {
        Some(existing) if existing.id == dragged => Ok(Placement::Stay { item: dragged }),
        Some(existing) => {
            check_kind(grids, origin.grid_id, existing.kind())?;
            Ok(Placement::Swap {
                dragged,
                dragged_to: target,
                displaced: existing.id,
                displaced_to: origin,
            })
        }
        None => Ok(Placement::Move {
            item: dragged,
            to: target,
        }),
    }
}

/// Write a resolved placement into the item store
pub fn apply(items: &mut ItemStore, placement: &Placement) {
    match *placement {
        Placement::Move { item, to } => relocate(items, item, to),
        Placement::Swap {
            dragged,
            dragged_to,
            displaced,
            displaced_to,
        } => {
            relocate(items, displaced, displaced_to);
            relocate(items, dragged, dragged_to);
        }
        Placement::Stay { .. } => {}
    }
    debug_assert!(items.check_invariants().is_ok(), "placement broke slot uniqueness");
}

fn relocate(items: &mut ItemStore, id: ItemId, to: SlotRef) {
    if let Some(item) = items.get_mut(id) {
        item.grid_id = to.grid_id;
        item.position = to.position;
    }
}

fn check_kind(grids: &GridStore, grid_id: GridId, kind: ItemKind) -> DomainResult<()> {
    let grid = grids.require(grid_id)?;
    if grid.kind.accepts(kind) {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!(
            "A {} cannot be placed on a {} shelf",
            kind.as_str(),
            grid.kind.as_str()
        )))
    }
}
