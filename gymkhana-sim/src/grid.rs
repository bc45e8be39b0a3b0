//! Sparse cell overlay with a per-episode lifetime.
use std::collections::HashMap;

/// State of a discretized cell. Cells absent from the grid are free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell {
    /// The car has occupied this cell during the episode.
    Visited,
    /// A known obstacle cell.
    Obstacle,
}

/// Sparse map from discretized cells to their state.
///
/// Positions are discretized by `cell_size`. The grid lives for one
/// episode and is cleared on reset.
#[derive(Clone, Debug)]
pub struct CellGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Cell>,
}

impl CellGrid {
    /// Creates an empty grid with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    /// The discretized cell under a position.
    pub fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// Marks the cell under the position as visited. Returns true if the
    /// cell was free before.
    pub fn mark_visited(&mut self, x: f64, y: f64) -> bool {
        let cell = self.cell_of(x, y);
        if self.cells.contains_key(&cell) {
            return false;
        }
        self.cells.insert(cell, Cell::Visited);
        true
    }

    /// Marks the cell under the position as an obstacle.
    pub fn mark_obstacle(&mut self, x: f64, y: f64) {
        let cell = self.cell_of(x, y);
        self.cells.insert(cell, Cell::Obstacle);
    }

    /// The state of the cell under the position, if any.
    pub fn get(&self, x: f64, y: f64) -> Option<Cell> {
        self.cells.get(&self.cell_of(x, y)).copied()
    }

    /// Removes all cell states.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of non-free cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if no cell has been marked.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_visit_then_revisit() {
        let mut grid = CellGrid::new(1.0);
        assert!(grid.mark_visited(10.2, 10.7));
        assert!(!grid.mark_visited(10.9, 10.1));
        assert!(grid.mark_visited(11.0, 10.0));
    }

    #[test]
    fn obstacle_cells_count_as_occupied() {
        let mut grid = CellGrid::new(1.0);
        grid.mark_obstacle(5.0, 5.0);
        assert!(!grid.mark_visited(5.5, 5.5));
        assert_eq!(grid.get(5.0, 5.0), Some(Cell::Obstacle));
    }

    #[test]
    fn clear_resets_the_overlay() {
        let mut grid = CellGrid::new(1.0);
        grid.mark_visited(1.0, 1.0);
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.mark_visited(1.0, 1.0));
    }
}
