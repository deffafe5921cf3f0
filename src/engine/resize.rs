//! Grid Resize Engine
//!
//! Adds and removes rows/columns without losing items.
//! Items that fall off the grid are hidden (never deleted) and remember the
//! cell they were shown in; growing the grid brings them back to that cell.
//!
//! Linear positions encode the grid width, so column changes re-encode every
//! visible item of the grid. Row changes never shift existing cells.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::position::{self, remap};
use crate::domain::{CapacityError, DomainError, DomainResult, Grid, Item, ItemId};

/// Dimension policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLimits {
    pub max_rows: usize,
    pub max_columns: usize,
}

impl Default for GridLimits {
    fn default() -> Self {
        Self {
            max_rows: 5,
            max_columns: 10,
        }
    }
}

impl GridLimits {
    pub fn check(&self, rows: usize, columns: usize) -> DomainResult<()> {
        if rows < 1 {
            return Err(DomainError::Capacity(CapacityError::MinRows));
        }
        if rows > self.max_rows {
            return Err(CapacityError::MaxRows { max: self.max_rows }.into());
        }
        if columns < 1 {
            return Err(DomainError::Capacity(CapacityError::MinColumns));
        }
        if columns > self.max_columns {
            return Err(CapacityError::MaxColumns {
                max: self.max_columns,
            }
            .into());
        }
        Ok(())
    }
}

/// What a resize did to the grid's items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeReport {
    pub hidden: Vec<ItemId>,
    pub restored: Vec<ItemId>,
    /// Visible items whose linear position was re-encoded
    pub moved: Vec<ItemId>,
}

impl ResizeReport {
    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty() && self.restored.is_empty() && self.moved.is_empty()
    }

    fn merge(&mut self, other: ResizeReport) {
        self.hidden.extend(other.hidden);
        self.restored.extend(other.restored);
        self.moved.extend(other.moved);
    }
}

pub fn add_row(grid: &mut Grid, items: &mut [Item], limits: &GridLimits) -> DomainResult<ResizeReport> {
    if grid.rows >= limits.max_rows {
        return Err(CapacityError::MaxRows {
            max: limits.max_rows,
        }
        .into());
    }
    grid.rows += 1;

    let mut report = ResizeReport::default();
    restore_hidden(grid, items, &mut report);
    log::debug!(
        "grid {} grew to {} rows, restored {:?}",
        grid.id,
        grid.rows,
        report.restored
    );
    Ok(report)
}

/// Hide every visible item of the last row
pub fn remove_row(grid: &mut Grid, items: &mut [Item]) -> DomainResult<ResizeReport> {
    if grid.rows <= 1 {
        return Err(DomainError::Capacity(CapacityError::MinRows));
    }

    let first_removed = position::to_position(grid.rows - 1, 0, grid.columns);
    let mut report = ResizeReport::default();
    for item in items
        .iter_mut()
        .filter(|i| i.grid_id == grid.id && i.is_visible())
    {
        if item.position >= first_removed {
            item.hide(grid.columns);
            report.hidden.push(item.id);
        }
    }
    grid.rows -= 1;

    log::debug!(
        "grid {} shrank to {} rows, hid {:?}",
        grid.id,
        grid.rows,
        report.hidden
    );
    Ok(report)
}

pub fn add_column(
    grid: &mut Grid,
    items: &mut [Item],
    limits: &GridLimits,
) -> DomainResult<ResizeReport> {
    if grid.columns >= limits.max_columns {
        return Err(CapacityError::MaxColumns {
            max: limits.max_columns,
        }
        .into());
    }

    let old = grid.columns;
    let new = old + 1;
    let mut report = ResizeReport::default();
    for item in items
        .iter_mut()
        .filter(|i| i.grid_id == grid.id && i.is_visible())
    {
        if let Some(position) = remap(item.position, old, new) {
            if position != item.position {
                item.position = position;
                report.moved.push(item.id);
            }
        }
    }
    grid.columns = new;

    restore_hidden(grid, items, &mut report);
    log::debug!(
        "grid {} grew to {} columns, restored {:?}",
        grid.id,
        grid.columns,
        report.restored
    );
    Ok(report)
}

/// Hide every visible item of the last column and re-encode the rest
pub fn remove_column(grid: &mut Grid, items: &mut [Item]) -> DomainResult<ResizeReport> {
    if grid.columns <= 1 {
        return Err(DomainError::Capacity(CapacityError::MinColumns));
    }

    let old = grid.columns;
    let new = old - 1;
    let mut report = ResizeReport::default();
    for item in items
        .iter_mut()
        .filter(|i| i.grid_id == grid.id && i.is_visible())
    {
        match remap(item.position, old, new) {
            None => {
                item.hide(old);
                report.hidden.push(item.id);
            }
            Some(position) => {
                if position != item.position {
                    item.position = position;
                    report.moved.push(item.id);
                }
            }
        }
    }
    grid.columns = new;

    log::debug!(
        "grid {} shrank to {} columns, hid {:?}",
        grid.id,
        grid.columns,
        report.hidden
    );
    Ok(report)
}

/// Step the grid to `rows x columns`, rows first.
/// Bounds are checked up front so a refused resize changes nothing.
pub fn resize_to(
    grid: &mut Grid,
    items: &mut [Item],
    rows: usize,
    columns: usize,
    limits: &GridLimits,
) -> DomainResult<ResizeReport> {
    limits.check(rows, columns)?;

    let mut report = ResizeReport::default();
    while grid.rows < rows {
        report.merge(add_row(grid, items, limits)?);
    }
    while grid.rows > rows {
        report.merge(remove_row(grid, items)?);
    }
    while grid.columns < columns {
        report.merge(add_column(grid, items, limits)?);
    }
    while grid.columns > columns {
        report.merge(remove_column(grid, items)?);
    }
    Ok(report)
}

/// Bring hidden items back to the cell they were hidden from, when that cell
/// exists again, is free and the grid kind still accepts the item.
/// Lower original positions win.
fn restore_hidden(grid: &Grid, items: &mut [Item], report: &mut ResizeReport) {
    let mut occupied: HashSet<usize> = items
        .iter()
        .filter(|i| i.grid_id == grid.id && i.is_visible())
        .map(|i| i.position)
        .collect();

    let mut candidates: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, i)| i.grid_id == grid.id && i.hidden && i.original_position.is_some())
        .map(|(index, _)| index)
        .collect();
    candidates.sort_by_key(|&index| (items[index].original_position, items[index].id));

    for index in candidates {
        let item = &mut items[index];
        let Some(original) = item.original_position else {
            continue;
        };
        if !grid.kind.accepts(item.kind()) {
            log::debug!(
                "item {} stays hidden, a {} shelf does not take a {}",
                item.id,
                grid.kind.as_str(),
                item.kind().as_str()
            );
            continue;
        }
        let width = item.original_columns.filter(|c| *c > 0).unwrap_or(grid.columns);
        let (row, col) = position::to_row_col(original, width);
        if row >= grid.rows || col >= grid.columns {
            continue;
        }

        let target = position::to_position(row, col, grid.columns);
        if !occupied.insert(target) {
            log::debug!("item {} stays hidden, slot {} is taken", item.id, target);
            continue;
        }
        item.position = target;
        item.hidden = false;
        report.restored.push(item.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GridId, GridKind, ItemPayload};

    fn grid(rows: usize, columns: usize) -> Grid {
        Grid::new(GridId(1), "Shelf".to_string(), rows, columns, GridKind::Book)
    }

    /// One book per slot, item id = position + 1
    fn full(grid: &Grid) -> Vec<Item> {
        (0..grid.capacity())
            .map(|p| {
                Item::new(
                    ItemId(p as u32 + 1),
                    grid.id,
                    p,
                    ItemPayload::book(&format!("Book {}", p)),
                )
            })
            .collect()
    }

    fn item(items: &[Item], id: u32) -> &Item {
        items.iter().find(|i| i.id == ItemId(id)).unwrap()
    }

    fn assert_unique(items: &[Item]) {
        let mut seen = HashSet::new();
        for i in items.iter().filter(|i| i.is_visible()) {
            assert!(seen.insert((i.grid_id, i.position)), "collision at {}", i.position);
        }
    }

    #[test]
    fn test_remove_then_add_row_restores_cells() {
        let mut g = grid(2, 4);
        let mut items = full(&g);

        let report = remove_row(&mut g, &mut items).unwrap();
        assert_eq!(g.rows, 1);
        assert_eq!(report.hidden.len(), 4);
        for p in 4..8 {
            let it = item(&items, p as u32 + 1);
            assert!(it.hidden);
            assert_eq!(it.original_position, Some(p));
        }
        for p in 0..4 {
            assert!(item(&items, p + 1).is_visible());
        }

        let report = add_row(&mut g, &mut items, &GridLimits::default()).unwrap();
        assert_eq!(g.rows, 2);
        assert_eq!(report.restored.len(), 4);
        for p in 4..8 {
            let it = item(&items, p as u32 + 1);
            assert!(!it.hidden);
            assert_eq!(it.position, p);
            assert_eq!(it.original_position, Some(p));
        }
        assert_unique(&items);
    }

    #[test]
    fn test_restore_skips_items_the_grid_no_longer_accepts() {
        let mut g = grid(2, 4);
        let mut items = vec![
            Item::new(ItemId(1), g.id, 4, ItemPayload::book("Dune")),
            Item::new(ItemId(2), g.id, 5, ItemPayload::sticker("star.png")),
        ];
        remove_row(&mut g, &mut items).unwrap();
        g.kind = GridKind::Music;

        let report = add_row(&mut g, &mut items, &GridLimits::default()).unwrap();
        assert_eq!(report.restored, vec![ItemId(2)]);
        let book = item(&items, 1);
        assert!(book.hidden);
        assert_eq!(book.original_position, Some(4));
        assert_eq!(item(&items, 2).position, 5);
    }

    #[test]
    fn test_remove_column_keeps_visual_layout() {
        let mut g = grid(2, 3);
        let mut items = full(&g);

        let report = remove_column(&mut g, &mut items).unwrap();
        assert_eq!(g.columns, 2);

        // old position 2 (row 0, col 2) and 5 (row 1, col 2) are hidden
        assert!(item(&items, 3).hidden);
        assert!(item(&items, 6).hidden);
        assert_eq!(item(&items, 3).original_position, Some(2));
        assert_eq!(item(&items, 6).original_position, Some(5));
        // row 0 survivors keep their positions
        assert_eq!(item(&items, 1).position, 0);
        assert_eq!(item(&items, 2).position, 1);
        // row 1 survivors are re-encoded
        assert_eq!(item(&items, 4).position, 2);
        assert_eq!(item(&items, 5).position, 3);

        assert_eq!(report.hidden, vec![ItemId(3), ItemId(6)]);
        assert_eq!(report.moved, vec![ItemId(4), ItemId(5)]);
        assert_unique(&items);
    }

    #[test]
    fn test_remove_then_add_column_round_trip() {
        let mut g = grid(2, 3);
        let mut items = full(&g);
        let before: Vec<(ItemId, usize)> = items.iter().map(|i| (i.id, i.position)).collect();

        remove_column(&mut g, &mut items).unwrap();
        let report = add_column(&mut g, &mut items, &GridLimits::default()).unwrap();

        assert_eq!(g.columns, 3);
        assert_eq!(report.restored, vec![ItemId(3), ItemId(6)]);
        for (id, position) in before {
            let it = item(&items, id.0);
            assert!(it.is_visible());
            assert_eq!(it.position, position);
        }
    }

    #[test]
    fn test_restore_survives_other_edits() {
        // hide the last column, then drop a row and add it back, then the column
        let mut g = grid(2, 3);
        let mut items = full(&g);
        let limits = GridLimits::default();

        remove_column(&mut g, &mut items).unwrap();
        remove_row(&mut g, &mut items).unwrap();
        add_row(&mut g, &mut items, &limits).unwrap();
        // (1, 0) and (1, 1) are back at 2x2 positions
        assert_eq!(item(&items, 4).position, 2);
        assert!(item(&items, 4).is_visible());
        assert!(item(&items, 6).hidden);

        add_column(&mut g, &mut items, &limits).unwrap();
        for p in 0..6 {
            let it = item(&items, p as u32 + 1);
            assert!(it.is_visible(), "item {} still hidden", p + 1);
            assert_eq!(it.position, p);
        }
        assert_unique(&items);
    }

    #[test]
    fn test_restore_skips_taken_slot() {
        let mut g = grid(2, 2);
        let mut items = full(&g);
        remove_row(&mut g, &mut items).unwrap();
        // a visible item already sits where item 3 wants to go
        items.push(Item::new(ItemId(10), g.id, 2, ItemPayload::book("Squatter")));

        add_row(&mut g, &mut items, &GridLimits::default()).unwrap();
        assert!(item(&items, 3).hidden);
        assert_eq!(item(&items, 4).position, 3);
        assert!(item(&items, 4).is_visible());
        assert_unique(&items);
    }

    #[test]
    fn test_add_column_reencodes_rows() {
        let mut g = grid(2, 2);
        let mut items = full(&g);

        let report = add_column(&mut g, &mut items, &GridLimits::default()).unwrap();
        // (1, 0) moves from 2 to 3, (1, 1) from 3 to 4
        assert_eq!(item(&items, 3).position, 3);
        assert_eq!(item(&items, 4).position, 4);
        assert_eq!(report.moved, vec![ItemId(3), ItemId(4)]);
    }

    #[test]
    fn test_bounds_are_enforced() {
        let limits = GridLimits::default();
        let mut g = grid(1, 1);
        let mut items = full(&g);

        assert_eq!(
            remove_row(&mut g, &mut items),
            Err(DomainError::Capacity(CapacityError::MinRows))
        );
        assert_eq!(
            remove_column(&mut g, &mut items),
            Err(DomainError::Capacity(CapacityError::MinColumns))
        );

        let mut g = grid(5, 10);
        assert_eq!(
            add_row(&mut g, &mut items, &limits),
            Err(DomainError::Capacity(CapacityError::MaxRows { max: 5 }))
        );
        assert_eq!(
            add_column(&mut g, &mut items, &limits),
            Err(DomainError::Capacity(CapacityError::MaxColumns { max: 10 }))
        );
        assert_eq!((g.rows, g.columns), (5, 10));
    }

    #[test]
    fn test_other_grids_untouched() {
        let mut g = grid(2, 2);
        let mut items = full(&g);
        items.push(Item::new(ItemId(50), GridId(2), 3, ItemPayload::book("Elsewhere")));

        remove_row(&mut g, &mut items).unwrap();
        remove_column(&mut g, &mut items).unwrap();

        let other = item(&items, 50);
        assert!(other.is_visible());
        assert_eq!(other.position, 3);
    }

    #[test]
    fn test_resize_to_steps_and_refuses_out_of_bounds() {
        let limits = GridLimits::default();
        let mut g = grid(2, 3);
        let mut items = full(&g);

        assert!(resize_to(&mut g, &mut items, 6, 3, &limits).is_err());
        assert_eq!((g.rows, g.columns), (2, 3));
        assert!(items.iter().all(|i| i.is_visible()));

        let report = resize_to(&mut g, &mut items, 1, 2, &limits).unwrap();
        assert_eq!((g.rows, g.columns), (1, 2));
        assert_eq!(report.hidden.len(), 4);
        assert_eq!(items.iter().filter(|i| i.is_visible()).count(), 2);

        let report = resize_to(&mut g, &mut items, 2, 3, &limits).unwrap();
        assert_eq!(report.restored.len(), 4);
        assert!(items.iter().all(|i| i.is_visible()));
        assert_unique(&items);
    }

    #[test]
    fn test_legacy_hidden_item_without_width() {
        let mut g = grid(1, 3);
        let mut items = vec![Item::new(ItemId(1), g.id, 4, ItemPayload::book("Old"))];
        items[0].hidden = true;
        items[0].original_position = Some(4);

        add_row(&mut g, &mut items, &GridLimits::default()).unwrap();
        assert!(items[0].is_visible());
        assert_eq!(items[0].position, 4);
    }
}
