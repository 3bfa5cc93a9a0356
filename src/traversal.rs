//! Grid traversal: the order in which a microscope visited the tiles of a grid
//!
//! A traversal starts in one corner of a `size_x` x `size_y` grid and moves
//! one tile per step. Row and column modes jump back to the starting edge at
//! the end of each line; snake modes reverse direction instead.
//!
//! ```text
//! row-by-row, right & down     snake-by-rows, right & down
//!   0 1 2                        0 1 2
//!   3 4 5                        5 4 3
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while stepping through a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraversalError {
    /// A grid must have at least one row and one column
    #[error("grid size must be at least 1x1, got {size_x}x{size_y}")]
    EmptyGrid { size_x: usize, size_y: usize },
    /// Positions must be requested as 0, 1, 2, ... without gaps
    #[error("traversal step {requested} requested out of order, expected step {expected}")]
    OutOfOrder { expected: usize, requested: usize },
    /// More steps requested than the grid has tiles
    #[error("traversal exceeded the {total} tiles of the grid")]
    Exhausted { total: usize },
}

/// How consecutive tiles of a sequential grid were acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    /// Fill a row, then jump back to the start of the next row
    RowByRow,
    /// Fill a column, then jump back to the start of the next column
    ColumnByColumn,
    /// Fill a row, step to the next row, fill it in the opposite direction
    SnakeByRows,
    /// Fill a column, step to the next column, fill it in the opposite direction
    SnakeByColumns,
}

impl TraversalOrder {
    pub const ALL: [TraversalOrder; 4] = [
        TraversalOrder::RowByRow,
        TraversalOrder::ColumnByColumn,
        TraversalOrder::SnakeByRows,
        TraversalOrder::SnakeByColumns,
    ];

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TraversalOrder::RowByRow => "Row-by-row",
            TraversalOrder::ColumnByColumn => "Column-by-column",
            TraversalOrder::SnakeByRows => "Snake by rows",
            TraversalOrder::SnakeByColumns => "Snake by columns",
        }
    }

    fn is_column_major(&self) -> bool {
        matches!(self, TraversalOrder::ColumnByColumn | TraversalOrder::SnakeByColumns)
    }
}

/// Corner the traversal starts in, named by the two directions it moves in.
///
/// Row modes read these as "Right & Down", "Left & Down", and so on; column
/// modes read the same corners as "Down & Right", "Down & Left", ... The
/// starting corner and the direction of travel are the same thing, so one
/// value serves both families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Corner {
    /// Start top-left, move right and down
    #[default]
    RightDown,
    /// Start top-right, move left and down
    LeftDown,
    /// Start bottom-left, move right and up
    RightUp,
    /// Start bottom-right, move left and up
    LeftUp,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::RightDown, Corner::LeftDown, Corner::RightUp, Corner::LeftUp];

    /// +1 when the traversal starts moving right, -1 when it starts moving left.
    pub fn x_sign(&self) -> isize {
        match self {
            Corner::RightDown | Corner::RightUp => 1,
            Corner::LeftDown | Corner::LeftUp => -1,
        }
    }

    /// +1 when the traversal starts moving down, -1 when it starts moving up.
    pub fn y_sign(&self) -> isize {
        match self {
            Corner::RightDown | Corner::LeftDown => 1,
            Corner::RightUp | Corner::LeftUp => -1,
        }
    }

    /// Label as shown for a given traversal order.
    pub fn label(&self, order: TraversalOrder) -> &'static str {
        match (order.is_column_major(), self) {
            (false, Corner::RightDown) => "Right & Down",
            (false, Corner::LeftDown) => "Left & Down",
            (false, Corner::RightUp) => "Right & Up",
            (false, Corner::LeftUp) => "Left & Up",
            (true, Corner::RightDown) => "Down & Right",
            (true, Corner::LeftDown) => "Down & Left",
            (true, Corner::RightUp) => "Up & Right",
            (true, Corner::LeftUp) => "Up & Left",
        }
    }
}

impl FromStr for Corner {
    type Err = String;

    /// Accepts both the row spelling (`right-down`) and the column spelling
    /// (`down-right`) of each corner.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '_', '&'], "-");
        let parts: Vec<&str> = normalized.split('-').filter(|p| !p.is_empty()).collect();
        let has = |word: &str| parts.contains(&word);

        if parts.len() != 2 {
            return Err(format!("invalid corner '{}', expected e.g. 'right-down'", s));
        }
        match (has("right"), has("left"), has("down"), has("up")) {
            (true, false, true, false) => Ok(Corner::RightDown),
            (false, true, true, false) => Ok(Corner::LeftDown),
            (true, false, false, true) => Ok(Corner::RightUp),
            (false, true, false, true) => Ok(Corner::LeftUp),
            _ => Err(format!("invalid corner '{}', expected e.g. 'right-down'", s)),
        }
    }
}

impl TryFrom<String> for Corner {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The kind of grid a set of tiles was acquired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridType {
    /// Tiles numbered by a single running index, visited in `order` from `corner`
    Sequential { order: TraversalOrder, corner: Corner },
    /// Tiles named by their absolute column and row
    FixedPosition,
}

impl GridType {
    /// Human readable label.
    pub fn label(&self) -> String {
        match self {
            GridType::Sequential { order, corner } => {
                format!("{}, {}", order.label(), corner.label(*order))
            }
            GridType::FixedPosition => "Filename defined position".to_string(),
        }
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Cursor carried from one traversal step to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalState {
    /// Current column
    pub x: usize,
    /// Current row
    pub y: usize,
    /// Current horizontal step direction, +1 or -1
    pub dx: isize,
    /// Current vertical step direction, +1 or -1
    pub dy: isize,
}

impl TraversalState {
    /// State at step 0 for a grid of the given size.
    pub fn start(corner: Corner, size_x: usize, size_y: usize) -> Self {
        let dx = corner.x_sign();
        let dy = corner.y_sign();
        Self {
            x: if dx > 0 { 0 } else { size_x - 1 },
            y: if dy > 0 { 0 } else { size_y - 1 },
            dx,
            dy,
        }
    }
}

/// One traversal of a sequential grid.
///
/// Each layout run owns its own `GridTraversal`; nothing is shared between
/// runs. Positions are produced either by calling [`GridTraversal::position`]
/// with indices `0, 1, 2, ...` or by iterating.
#[derive(Debug, Clone)]
pub struct GridTraversal {
    order: TraversalOrder,
    corner: Corner,
    size_x: usize,
    size_y: usize,
    state: Option<TraversalState>,
    next_index: usize,
}

impl GridTraversal {
    pub fn new(
        order: TraversalOrder,
        corner: Corner,
        size_x: usize,
        size_y: usize,
    ) -> Result<Self, TraversalError> {
        if size_x == 0 || size_y == 0 {
            return Err(TraversalError::EmptyGrid { size_x, size_y });
        }
        Ok(Self { order, corner, size_x, size_y, state: None, next_index: 0 })
    }

    /// Total number of steps in a complete traversal.
    pub fn len(&self) -> usize {
        self.total()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    // Not `len`: `ExactSizeIterator::len` counts only the remaining steps.
    fn total(&self) -> usize {
        self.size_x * self.size_y
    }

    /// Current cursor, `None` before the first step.
    pub fn state(&self) -> Option<TraversalState> {
        self.state
    }

    /// Grid position `(x, y)` of step `index`.
    ///
    /// `index` must be exactly one more than the previous call (or 0 on the
    /// first call); the traversal is incremental.
    pub fn position(&mut self, index: usize) -> Result<(usize, usize), TraversalError> {
        if index != self.next_index {
            return Err(TraversalError::OutOfOrder { expected: self.next_index, requested: index });
        }
        let total = self.total();
        if index >= total {
            return Err(TraversalError::Exhausted { total });
        }

        let state = match self.state {
            None => TraversalState::start(self.corner, self.size_x, self.size_y),
            Some(state) => self.advance(state),
        };
        self.state = Some(state);
        self.next_index += 1;

        tracing::debug!(step = index, x = state.x, y = state.y, "traversal step");
        Ok((state.x, state.y))
    }

    fn advance(&self, s: TraversalState) -> TraversalState {
        let last_x = self.size_x - 1;
        let last_y = self.size_y - 1;
        let mut next = s;

        match self.order {
            TraversalOrder::RowByRow => {
                if at_line_end(s.x, s.dx, last_x) {
                    next.y = step(s.y, s.dy);
                    next.x = if s.dx > 0 { 0 } else { last_x };
                } else {
                    next.x = step(s.x, s.dx);
                }
            }
            TraversalOrder::ColumnByColumn => {
                if at_line_end(s.y, s.dy, last_y) {
                    next.x = step(s.x, s.dx);
                    next.y = if s.dy > 0 { 0 } else { last_y };
                } else {
                    next.y = step(s.y, s.dy);
                }
            }
            TraversalOrder::SnakeByRows => {
                if at_line_end(s.x, s.dx, last_x) {
                    next.y = step(s.y, s.dy);
                    next.dx = -s.dx;
                } else {
                    next.x = step(s.x, s.dx);
                }
            }
            TraversalOrder::SnakeByColumns => {
                if at_line_end(s.y, s.dy, last_y) {
                    next.x = step(s.x, s.dx);
                    next.dy = -s.dy;
                } else {
                    next.y = step(s.y, s.dy);
                }
            }
        }

        next
    }
}

impl Iterator for GridTraversal {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        self.position(self.next_index).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next_index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridTraversal {}

/// Whether moving one step in `sign` from `pos` would leave `0..=last`.
fn at_line_end(pos: usize, sign: isize, last: usize) -> bool {
    if sign > 0 {
        pos >= last
    } else {
        pos == 0
    }
}

// Callers never step past the last tile, so the wrap cannot be observed.
fn step(pos: usize, sign: isize) -> usize {
    pos.wrapping_add_signed(sign)
}

/// Visiting order of a whole fixed-position grid: plain row-major.
pub fn row_major_positions(size_x: usize, size_y: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..size_y).flat_map(move |y| (0..size_x).map(move |x| (x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn walk(order: TraversalOrder, corner: Corner, sx: usize, sy: usize) -> Vec<(usize, usize)> {
        GridTraversal::new(order, corner, sx, sy).unwrap().collect()
    }

    #[test]
    fn test_every_mode_covers_grid_once() {
        for order in TraversalOrder::ALL {
            for corner in Corner::ALL {
                for sx in 1..=5 {
                    for sy in 1..=5 {
                        let positions = walk(order, corner, sx, sy);
                        assert_eq!(positions.len(), sx * sy, "{:?} {:?} {}x{}", order, corner, sx, sy);
                        let unique: HashSet<_> = positions.iter().copied().collect();
                        assert_eq!(unique.len(), sx * sy, "{:?} {:?} {}x{}", order, corner, sx, sy);
                        assert!(positions.iter().all(|&(x, y)| x < sx && y < sy));
                    }
                }
            }
        }
    }

    #[test]
    fn test_position_reaches_every_step() {
        let mut t = GridTraversal::new(TraversalOrder::RowByRow, Corner::RightDown, 3, 1).unwrap();
        assert_eq!(t.position(0), Ok((0, 0)));
        assert_eq!(t.position(1), Ok((1, 0)));
        assert_eq!(t.position(2), Ok((2, 0)));
        assert_eq!(t.len(), 3);
        assert_eq!(t.position(3), Err(TraversalError::Exhausted { total: 3 }));
    }

    #[test]
    fn test_column_modes_on_wide_grid() {
        let down_right = walk(TraversalOrder::ColumnByColumn, Corner::RightDown, 4, 3);
        assert_eq!(
            down_right,
            vec![
                (0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2),
                (2, 0), (2, 1), (2, 2), (3, 0), (3, 1), (3, 2),
            ]
        );

        let up_left = walk(TraversalOrder::ColumnByColumn, Corner::LeftUp, 4, 3);
        assert_eq!(
            up_left,
            vec![
                (3, 2), (3, 1), (3, 0), (2, 2), (2, 1), (2, 0),
                (1, 2), (1, 1), (1, 0), (0, 2), (0, 1), (0, 0),
            ]
        );

        let snake_down_left = walk(TraversalOrder::SnakeByColumns, Corner::LeftDown, 4, 3);
        assert_eq!(
            snake_down_left,
            vec![
                (3, 0), (3, 1), (3, 2), (2, 2), (2, 1), (2, 0),
                (1, 0), (1, 1), (1, 2), (0, 2), (0, 1), (0, 0),
            ]
        );
    }

    #[test]
    fn test_snake_by_rows_reverses() {
        let xs: Vec<usize> =
            walk(TraversalOrder::SnakeByRows, Corner::RightDown, 3, 2).iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![0, 1, 2, 2, 1, 0]);
    }

    #[test]
    fn test_row_by_row_right_down() {
        let positions = walk(TraversalOrder::RowByRow, Corner::RightDown, 3, 2);
        assert_eq!(positions, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_row_by_row_left_up() {
        let positions = walk(TraversalOrder::RowByRow, Corner::LeftUp, 2, 2);
        assert_eq!(positions, vec![(1, 1), (0, 1), (1, 0), (0, 0)]);
    }

    #[test]
    fn test_column_by_column_down_left() {
        let positions = walk(TraversalOrder::ColumnByColumn, Corner::LeftDown, 2, 3);
        assert_eq!(positions, vec![(1, 0), (1, 1), (1, 2), (0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn test_snake_by_columns_up_right() {
        let positions = walk(TraversalOrder::SnakeByColumns, Corner::RightUp, 2, 3);
        assert_eq!(positions, vec![(0, 2), (0, 1), (0, 0), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_snake_by_rows_left_up() {
        let positions = walk(TraversalOrder::SnakeByRows, Corner::LeftUp, 2, 2);
        assert_eq!(positions, vec![(1, 1), (0, 1), (0, 0), (1, 0)]);
    }

    #[test]
    fn test_snake_state_flips_direction() {
        let mut t = GridTraversal::new(TraversalOrder::SnakeByRows, Corner::RightDown, 2, 2).unwrap();
        t.position(0).unwrap();
        assert_eq!(t.state().unwrap().dx, 1);
        t.position(1).unwrap();
        t.position(2).unwrap();
        assert_eq!(t.state().unwrap().dx, -1);
        assert_eq!(t.state().unwrap().dy, 1);
    }

    #[test]
    fn test_out_of_order_is_rejected() {
        let mut t = GridTraversal::new(TraversalOrder::RowByRow, Corner::RightDown, 2, 2).unwrap();
        assert_eq!(t.position(1), Err(TraversalError::OutOfOrder { expected: 0, requested: 1 }));
        t.position(0).unwrap();
        assert_eq!(t.position(0), Err(TraversalError::OutOfOrder { expected: 1, requested: 0 }));
    }

    #[test]
    fn test_exhausted() {
        let mut t = GridTraversal::new(TraversalOrder::SnakeByRows, Corner::RightDown, 1, 2).unwrap();
        t.position(0).unwrap();
        t.position(1).unwrap();
        assert_eq!(t.position(2), Err(TraversalError::Exhausted { total: 2 }));
        assert_eq!(t.next(), None);
    }

    #[test]
    fn test_empty_grid() {
        assert!(matches!(
            GridTraversal::new(TraversalOrder::RowByRow, Corner::RightDown, 0, 3),
            Err(TraversalError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn test_independent_traversals() {
        let mut a = GridTraversal::new(TraversalOrder::SnakeByRows, Corner::RightDown, 3, 3).unwrap();
        let mut b = a.clone();
        let first: Vec<_> = a.by_ref().take(4).collect();
        let all_b: Vec<_> = b.by_ref().collect();
        assert_eq!(&all_b[..4], &first[..]);
        assert_eq!(a.count(), 5);
    }

    #[test]
    fn test_corner_from_str() {
        assert_eq!("right-down".parse::<Corner>().unwrap(), Corner::RightDown);
        assert_eq!("down-right".parse::<Corner>().unwrap(), Corner::RightDown);
        assert_eq!("Up & Left".parse::<Corner>().unwrap(), Corner::LeftUp);
        assert_eq!("left_down".parse::<Corner>().unwrap(), Corner::LeftDown);
        assert!("left-right".parse::<Corner>().is_err());
        assert!("down".parse::<Corner>().is_err());
    }

    #[test]
    fn test_row_major_positions() {
        let positions: Vec<_> = row_major_positions(2, 2).collect();
        assert_eq!(positions, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_grid_type_label() {
        let grid = GridType::Sequential { order: TraversalOrder::SnakeByColumns, corner: Corner::LeftUp };
        assert_eq!(grid.label(), "Snake by columns, Up & Left");
        assert_eq!(GridType::FixedPosition.to_string(), "Filename defined position");
    }
}
