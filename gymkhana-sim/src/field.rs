//! Obstacle field providers.
//!
//! A [`Field`] supplies the static, per-episode obstacle layout the car
//! drives through: its bounds, an obstacle-membership test and a
//! collision-free start position. Two providers are implemented: a field of
//! random axis-aligned rectangles and a generated maze.
mod maze;
mod rect;
use anyhow::Result;
pub use maze::{MazeField, MazeFieldConfig};
pub use rect::{Rect, RectField, RectFieldConfig};

/// A provider of an obstacle layout.
pub trait Field {
    /// Configuration of the field.
    type Config: Clone;

    /// Builds a field with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Width and height of the field.
    fn bounds(&self) -> (f64, f64);

    /// Returns true if the point lies on an obstacle.
    ///
    /// The predicate is total over the plane; points outside the bounds are
    /// treated as blocked.
    fn is_obstacle(&self, x: f64, y: f64) -> bool;

    /// The start position of the car. Implementations guarantee that the
    /// returned point is not on an obstacle.
    fn start_position(&self) -> (f64, f64);
}
