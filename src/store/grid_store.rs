//! Grid Store
//!
//! In-memory collection of grids plus the active-grid selection.
//! Row/column changes do not go through here; see `engine::resize`.

use serde_json::{Map, Value};

use crate::domain::{CapacityError, DomainError, DomainResult, Grid, GridId, GridKind, GridSpec};
use crate::engine::resize::GridLimits;

#[derive(Debug, Clone)]
pub struct GridStore {
    grids: Vec<Grid>,
    active: Option<GridId>,
    /// `None` once every id has been handed out
    next_id: Option<u32>,
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GridStore {
    pub fn new() -> Self {
        Self {
            grids: Vec::new(),
            active: None,
            next_id: Some(1),
        }
    }

    /// Rebuild from persisted parts; a dangling active id falls back to the first grid
    pub fn from_parts(grids: Vec<Grid>, active: Option<GridId>) -> Self {
        let next_id = match grids.iter().map(|g| g.id.0).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        if next_id.is_none() {
            log::warn!("stored grid ids are exhausted, new grids will be refused");
        }
        let active = active
            .filter(|id| grids.iter().any(|g| g.id == *id))
            .or_else(|| grids.first().map(|g| g.id));
        Self {
            grids,
            active,
            next_id,
        }
    }

    /// Never hand out `id` or anything below it
    pub fn reserve_ids(&mut self, id: u32) {
        self.next_id = match (self.next_id, id.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
    }

    pub fn list(&self) -> &[Grid] {
        &self.grids
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn get(&self, id: GridId) -> Option<&Grid> {
        self.grids.iter().find(|g| g.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: GridId) -> Option<&mut Grid> {
        self.grids.iter_mut().find(|g| g.id == id)
    }

    pub fn require(&self, id: GridId) -> DomainResult<&Grid> {
        self.get(id)
            .ok_or_else(|| DomainError::NotFound(format!("Grid {}", id)))
    }

    pub fn active(&self) -> Option<GridId> {
        self.active
    }

    /// Store a new grid and make it active
    pub fn create(&mut self, spec: GridSpec, limits: &GridLimits) -> DomainResult<GridId> {
        limits.check(spec.rows, spec.columns)?;
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidInput("Shelf name cannot be empty".into()));
        }

        let raw = self
            .next_id
            .ok_or_else(|| DomainError::Internal("No shelf ids left".into()))?;
        let id = GridId(raw);
        self.next_id = raw.checked_add(1);

        let mut grid = Grid::new(id, name.to_string(), spec.rows, spec.columns, spec.kind);
        grid.style = spec.style;
        self.grids.push(grid);
        self.active = Some(id);
        Ok(id)
    }

    /// Merge the non-positional fields
    pub fn update_meta(
        &mut self,
        id: GridId,
        name: Option<String>,
        kind: Option<GridKind>,
        style: Option<Map<String, Value>>,
    ) -> DomainResult<()> {
        let grid = self
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound(format!("Grid {}", id)))?;

        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::InvalidInput("Shelf name cannot be empty".into()));
            }
            grid.name = name.to_string();
        }
        if let Some(kind) = kind {
            grid.kind = kind;
        }
        if let Some(style) = style {
            grid.style = style;
        }
        Ok(())
    }

    /// Remove a grid; the last one cannot be removed.
    /// Items are not touched here, the caller cascades.
    pub fn remove(&mut self, id: GridId) -> DomainResult<Grid> {
        let index = self
            .grids
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("Grid {}", id)))?;
        if self.grids.len() == 1 {
            return Err(CapacityError::LastGrid.into());
        }

        let removed = self.grids.remove(index);
        if self.active == Some(id) {
            self.active = self.grids.first().map(|g| g.id);
        }
        Ok(removed)
    }

    pub fn set_active(&mut self, id: GridId) -> DomainResult<()> {
        self.require(id)?;
        self.active = Some(id);
        Ok(())
    }
}
