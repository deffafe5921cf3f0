//! Position Index
//!
//! Conversions between a linear slot index and a (row, col) cell.
//! Linear positions encode the grid width, so any column change needs `remap`.

/// Cell of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

/// `columns` must be at least 1
pub fn to_row_col(position: usize, columns: usize) -> (usize, usize) {
    debug_assert!(columns >= 1, "grid must have at least one column");
    (position / columns, position % columns)
}

pub fn to_position(row: usize, col: usize, columns: usize) -> usize {
    row * columns + col
}

pub fn to_cell(position: usize, columns: usize) -> Cell {
    let (row, col) = to_row_col(position, columns);
    Cell { row, col }
}

/// Number of slots in a grid
pub fn capacity(rows: usize, columns: usize) -> usize {
    rows * columns
}

/// Same (row, col) under a new width, `None` if the column no longer exists
pub fn remap(position: usize, old_columns: usize, new_columns: usize) -> Option<usize> {
    let (row, col) = to_row_col(position, old_columns);
    (col < new_columns).then(|| to_position(row, col, new_columns))
}
