//! Grid geometry primitives.

use serde::{Deserialize, Serialize};

/// A cell on the grid, serialized as an ordered pair `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u16, u16)", into = "(u16, u16)")]
pub struct Cell {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
}

impl From<(u16, u16)> for Cell {
    fn from((x, y): (u16, u16)) -> Self {
        Self { x, y }
    }
}

impl From<Cell> for (u16, u16) {
    fn from(cell: Cell) -> Self {
        (cell.x, cell.y)
    }
}

impl Cell {
    /// Create a new cell.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Offset this cell by a signed delta, if the result stays on the grid.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32, grid: GridSize) -> Option<Cell> {
        let x = i32::from(self.x) + dx;
        let y = i32::from(self.y) + dy;
        if x < 0 || y < 0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cell = Cell::new(x as u16, y as u16);
        grid.contains(cell).then_some(cell)
    }
}

/// Grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    /// Width in cells.
    pub w: u16,
    /// Height in cells.
    pub h: u16,
}

impl GridSize {
    /// Smallest playable grid on either axis.
    pub const MIN_DIMENSION: u16 = 5;

    /// Create a new grid size.
    #[must_use]
    pub const fn new(w: u16, h: u16) -> Self {
        Self { w, h }
    }

    /// Check if a cell is within bounds.
    #[must_use]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.x < self.w && cell.y < self.h
    }

    /// Total cell count.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        usize::from(self.w) * usize::from(self.h)
    }

    /// The map center (floor on both axes).
    #[must_use]
    pub const fn center(&self) -> Cell {
        Cell::new(self.w / 2, self.h / 2)
    }

    /// All cells in row-major order (y outer, x inner).
    pub fn cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let (w, h) = (self.w, self.h);
        (0..h).flat_map(move |y| (0..w).map(move |x| Cell::new(x, y)))
    }

    /// Interior cells: at least one cell away from every edge.
    pub fn interior_cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let (w, h) = (self.w, self.h);
        (1..h.saturating_sub(1)).flat_map(move |y| (1..w.saturating_sub(1)).map(move |x| Cell::new(x, y)))
    }

    /// In-bounds 4-neighbors of a cell, enumerated up, down, left, right.
    #[must_use]
    pub fn neighbors4(&self, cell: Cell) -> Vec<Cell> {
        const DELTAS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        DELTAS
            .iter()
            .filter_map(|&(dx, dy)| cell.offset(dx, dy, *self))
            .collect()
    }

    /// In-bounds cells at exactly Manhattan distance `d` from `center`.
    ///
    /// Enumeration order is fixed (dx from -d to d, +dy before -dy) so
    /// that downstream placement stays deterministic.
    #[must_use]
    pub fn ring(&self, center: Cell, d: u16) -> Vec<Cell> {
        if d == 0 {
            return self.contains(center).then_some(center).into_iter().collect();
        }
        let d = i32::from(d);
        let mut cells = Vec::new();
        for dx in -d..=d {
            let rest = d - dx.abs();
            if let Some(cell) = center.offset(dx, rest, *self) {
                cells.push(cell);
            }
            if rest != 0
                && let Some(cell) = center.offset(dx, -rest, *self)
            {
                cells.push(cell);
            }
        }
        cells
    }
}

/// Manhattan distance between two cells.
#[must_use]
pub fn manhattan(a: Cell, b: Cell) -> u32 {
    u32::from(a.x.abs_diff(b.x)) + u32::from(a.y.abs_diff(b.y))
}

/// Whether two cells share a row or column.
#[must_use]
pub const fn straight_line(a: Cell, b: Cell) -> bool {
    a.x == b.x || a.y == b.y
}

/// Whether two cells lie on a common diagonal.
#[must_use]
pub const fn diagonal_line(a: Cell, b: Cell) -> bool {
    a.x.abs_diff(b.x) == a.y.abs_diff(b.y)
}

/// Whether `c` lies strictly between `a` and `b` on their shared row or
/// column. False when `a` and `b` are not on a straight line.
#[must_use]
pub fn strictly_between_on_line(c: Cell, a: Cell, b: Cell) -> bool {
    if a.x == b.x {
        c.x == a.x && (a.y.min(b.y) < c.y && c.y < a.y.max(b.y))
    } else if a.y == b.y {
        c.y == a.y && (a.x.min(b.x) < c.x && c.x < a.x.max(b.x))
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_serde_as_pair() {
        let cell = Cell::new(3, 7);
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, "[3,7]");
        let back: Cell = serde_json::from_str("[3,7]").unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(manhattan(Cell::new(2, 5), Cell::new(10, 5)), 8);
        assert_eq!(manhattan(Cell::new(0, 0), Cell::new(3, 4)), 7);
        assert_eq!(manhattan(Cell::new(4, 4), Cell::new(4, 4)), 0);
    }

    #[test]
    fn test_line_predicates() {
        assert!(straight_line(Cell::new(2, 5), Cell::new(10, 5)));
        assert!(straight_line(Cell::new(2, 1), Cell::new(2, 9)));
        assert!(!straight_line(Cell::new(2, 5), Cell::new(3, 6)));

        assert!(diagonal_line(Cell::new(2, 2), Cell::new(5, 5)));
        assert!(diagonal_line(Cell::new(5, 2), Cell::new(2, 5)));
        assert!(!diagonal_line(Cell::new(2, 2), Cell::new(5, 4)));
    }

    #[test]
    fn test_strictly_between() {
        let a = Cell::new(2, 5);
        let b = Cell::new(10, 5);
        assert!(strictly_between_on_line(Cell::new(6, 5), a, b));
        // Endpoints are not between.
        assert!(!strictly_between_on_line(a, a, b));
        assert!(!strictly_between_on_line(b, a, b));
        // Off the line.
        assert!(!strictly_between_on_line(Cell::new(6, 6), a, b));
    }

    #[test]
    fn test_neighbors4_corner() {
        let grid = GridSize::new(8, 8);
        let neighbors = grid.neighbors4(Cell::new(0, 0));
        assert_eq!(neighbors, vec![Cell::new(0, 1), Cell::new(1, 0)]);
    }

    #[test]
    fn test_ring_counts_and_distance() {
        let grid = GridSize::new(32, 32);
        let center = Cell::new(16, 16);
        for d in 1..5 {
            let ring = grid.ring(center, d);
            assert_eq!(ring.len(), usize::from(d) * 4, "ring {d}");
            assert!(ring.iter().all(|&c| manhattan(c, center) == u32::from(d)));
        }
    }

    #[test]
    fn test_ring_clipped_at_edge() {
        let grid = GridSize::new(8, 8);
        let ring = grid.ring(Cell::new(0, 0), 2);
        assert!(ring.iter().all(|&c| grid.contains(c)));
        assert!(ring.iter().all(|&c| manhattan(c, Cell::new(0, 0)) == 2));
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_interior_excludes_border() {
        let grid = GridSize::new(5, 5);
        let interior: Vec<Cell> = grid.interior_cells().collect();
        assert_eq!(interior.len(), 9);
        assert!(interior.iter().all(|c| c.x >= 1 && c.x <= 3 && c.y >= 1 && c.y <= 3));
    }

    #[test]
    fn test_offset_out_of_bounds() {
        let grid = GridSize::new(4, 4);
        assert_eq!(Cell::new(0, 0).offset(-1, 0, grid), None);
        assert_eq!(Cell::new(3, 3).offset(1, 0, grid), None);
        assert_eq!(Cell::new(1, 1).offset(1, 1, grid), Some(Cell::new(2, 2)));
    }
}
