//! Consumer-only rendering of simulation state.
//!
//! Rendering consumes car, scan and field state and produces nothing back
//! into the simulation; a [`Frame`] only hands out shared references, so a
//! renderer cannot alter the episode. Training runs headless by not
//! rendering at all.
use crate::{
    car::Car,
    field::Field,
    grid::{Cell, CellGrid},
    sensor::SensorScan,
};
use std::io::{self, Write};

/// A read-only view of the simulation state.
pub struct Frame<'a, F: Field> {
    /// The obstacle field.
    pub field: &'a F,
    /// The car.
    pub car: &'a Car,
    /// The latest sensor scan.
    pub scan: &'a SensorScan,
    /// The visited-cell overlay of the episode.
    pub visited: &'a CellGrid,
}

/// Renders frames.
pub trait Renderer<F: Field> {
    /// Renders one frame.
    fn render(&mut self, frame: &Frame<'_, F>);
}

/// Discards every frame.
pub struct NullRenderer;

impl<F: Field> Renderer<F> for NullRenderer {
    fn render(&mut self, _frame: &Frame<'_, F>) {}
}

/// Renders the field, the car and the radar hit points as an ASCII grid.
pub struct AsciiRenderer<W: Write> {
    cols: usize,
    rows: usize,
    out: W,
}

impl AsciiRenderer<io::Stdout> {
    /// An ASCII renderer writing to stdout.
    pub fn stdout(cols: usize, rows: usize) -> Self {
        Self::new(cols, rows, io::stdout())
    }
}

impl<W: Write> AsciiRenderer<W> {
    /// An ASCII renderer of `cols` x `rows` characters writing to `out`.
    pub fn new(cols: usize, rows: usize, out: W) -> Self {
        Self { cols, rows, out }
    }

    fn plot(&self, canvas: &mut [Vec<char>], w: f64, h: f64, x: f64, y: f64, c: char) {
        let col = (x / w * self.cols as f64) as isize;
        let row = (y / h * self.rows as f64) as isize;
        if col >= 0 && (col as usize) < self.cols && row >= 0 && (row as usize) < self.rows {
            canvas[row as usize][col as usize] = c;
        }
    }
}

impl<F: Field, W: Write> Renderer<F> for AsciiRenderer<W> {
    fn render(&mut self, frame: &Frame<'_, F>) {
        let (w, h) = frame.field.bounds();
        let mut canvas = vec![vec![' '; self.cols]; self.rows];

        for (row, line) in canvas.iter_mut().enumerate() {
            for (col, ch) in line.iter_mut().enumerate() {
                let x = (col as f64 + 0.5) * w / self.cols as f64;
                let y = (row as f64 + 0.5) * h / self.rows as f64;
                if frame.field.is_obstacle(x, y) {
                    *ch = '#';
                } else if frame.visited.get(x, y) == Some(Cell::Visited) {
                    *ch = '.';
                }
            }
        }

        for ray in &frame.scan.rays {
            self.plot(&mut canvas, w, h, ray.hit.0, ray.hit.1, '*');
        }
        self.plot(&mut canvas, w, h, frame.car.x, frame.car.y, 'C');

        let mut text = String::with_capacity((self.cols + 1) * self.rows);
        for line in &canvas {
            text.extend(line.iter());
            text.push('\n');
        }
        // Rendering failures must not affect the simulation.
        if self.out.write_all(text.as_bytes()).is_err() {
            log::warn!("Failed to write a rendered frame");
        }
    }
}
