//! Generated maze field.
use super::Field;
use crate::SimError;
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`MazeField`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MazeFieldConfig {
    /// Width of the field. Rounded down to an odd number of cells.
    pub width: f64,

    /// Height of the field. Rounded down to an odd number of cells.
    pub height: f64,

    /// Edge length of one maze cell.
    pub cell_size: f64,
}

impl Default for MazeFieldConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            cell_size: 40.0,
        }
    }
}

/// A maze on a binary occupancy grid.
///
/// The maze is carved with randomized depth-first backtracking: passage
/// cells sit at odd grid indices, wall cells between them are removed as
/// the walk visits their neighbors. The car starts at the center of the
/// first passage cell.
pub struct MazeField {
    width: f64,
    height: f64,
    cell_size: f64,
    columns: usize,
    rows: usize,
    /// Occupancy grid, row major; 1 is a wall.
    grid: Vec<u8>,
}

impl MazeField {
    fn at(&self, gx: usize, gy: usize) -> u8 {
        self.grid[gy * self.columns + gx]
    }

    /// Number of grid columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of grid rows.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl Field for MazeField {
    type Config = MazeFieldConfig;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let odd = |n: usize| if n % 2 == 0 { n.saturating_sub(1) } else { n };
        let columns = odd((config.width / config.cell_size) as usize);
        let rows = odd((config.height / config.cell_size) as usize);
        if columns < 3 || rows < 3 {
            return Err(SimError::FieldTooSmall {
                width: config.width,
                height: config.height,
                cell_size: config.cell_size,
            }
            .into());
        }
        // Logical maze cells at odd grid indices.
        let mw = (columns - 1) / 2;
        let mh = (rows - 1) / 2;

        let mut grid = vec![1u8; columns * rows];
        let mut visited = vec![false; mw * mh];
        let mut stack = vec![(0usize, 0usize)];
        let mut rng = StdRng::seed_from_u64(seed as u64);

        let carve = |grid: &mut Vec<u8>, gx: usize, gy: usize| grid[gy * columns + gx] = 0;
        visited[0] = true;
        carve(&mut grid, 1, 1);

        while let Some(&(cx, cy)) = stack.last() {
            let mut neighbors = Vec::with_capacity(4);
            if cx > 0 && !visited[cy * mw + cx - 1] {
                neighbors.push((cx - 1, cy));
            }
            if cx + 1 < mw && !visited[cy * mw + cx + 1] {
                neighbors.push((cx + 1, cy));
            }
            if cy > 0 && !visited[(cy - 1) * mw + cx] {
                neighbors.push((cx, cy - 1));
            }
            if cy + 1 < mh && !visited[(cy + 1) * mw + cx] {
                neighbors.push((cx, cy + 1));
            }

            if neighbors.is_empty() {
                stack.pop();
                continue;
            }

            let (nx, ny) = neighbors[rng.gen_range(0..neighbors.len())];
            visited[ny * mw + nx] = true;
            // Carve the neighbor cell and the wall between.
            carve(&mut grid, 2 * nx + 1, 2 * ny + 1);
            carve(&mut grid, cx + nx + 1, cy + ny + 1);
            stack.push((nx, ny));
        }

        Ok(Self {
            width: columns as f64 * config.cell_size,
            height: rows as f64 * config.cell_size,
            cell_size: config.cell_size,
            columns,
            rows,
            grid,
        })
    }

    fn bounds(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn is_obstacle(&self, x: f64, y: f64) -> bool {
        let gx = (x / self.cell_size).floor();
        let gy = (y / self.cell_size).floor();
        if gx < 0.0 || gy < 0.0 || gx >= self.columns as f64 || gy >= self.rows as f64 {
            return true;
        }
        self.at(gx as usize, gy as usize) == 1
    }

    fn start_position(&self) -> (f64, f64) {
        (1.5 * self.cell_size, 1.5 * self.cell_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_cell_is_carved() {
        let field = MazeField::build(&MazeFieldConfig::default(), 0).unwrap();
        let (sx, sy) = field.start_position();
        assert!(!field.is_obstacle(sx, sy));
    }

    #[test]
    fn out_of_bounds_is_blocked() {
        let field = MazeField::build(&MazeFieldConfig::default(), 0).unwrap();
        let (w, h) = field.bounds();
        assert!(field.is_obstacle(-1.0, 100.0));
        assert!(field.is_obstacle(w, 100.0));
        assert!(field.is_obstacle(100.0, h));
    }

    #[test]
    fn every_passage_cell_is_reached() {
        // Depth-first backtracking visits every logical cell, so all odd
        // (column, row) pairs must be carved.
        let field = MazeField::build(&MazeFieldConfig::default(), 11).unwrap();
        for cy in (1..field.rows()).step_by(2) {
            for cx in (1..field.columns()).step_by(2) {
                let x = (cx as f64 + 0.5) * 40.0;
                let y = (cy as f64 + 0.5) * 40.0;
                assert!(!field.is_obstacle(x, y), "cell ({}, {})", cx, cy);
            }
        }
    }

    #[test]
    fn degenerate_bounds_are_rejected() {
        let config = MazeFieldConfig {
            width: 80.0,
            height: 80.0,
            cell_size: 40.0,
        };
        assert!(MazeField::build(&config, 0).is_err());
    }
}
