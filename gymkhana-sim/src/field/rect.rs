//! Random rectangle obstacle field.
use super::Field;
use anyhow::Result;
use log::warn;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub w: f64,
    /// Height.
    pub h: f64,
}

impl Rect {
    /// Returns true if the point lies inside the rectangle.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }

    fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    fn inflate(&self, margin: f64) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }
}

/// Configuration of [`RectField`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RectFieldConfig {
    /// Width of the field.
    pub width: f64,

    /// Height of the field.
    pub height: f64,

    /// Number of obstacles to place.
    pub obstacle_count: usize,

    /// Minimum obstacle edge length.
    pub min_size: f64,

    /// Maximum obstacle edge length.
    pub max_size: f64,

    /// Minimum gap between obstacles.
    pub min_gap: f64,

    /// Start position of the car.
    pub start: (f64, f64),

    /// Obstacle-free radius kept around the start position.
    pub start_clearance: f64,

    /// Placement attempts per obstacle before giving up on it.
    pub attempt_limit: usize,
}

impl Default for RectFieldConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            obstacle_count: 10,
            min_size: 30.0,
            max_size: 100.0,
            min_gap: 10.0,
            start: (100.0, 100.0),
            start_clearance: 20.0,
            attempt_limit: 1000,
        }
    }
}

impl RectFieldConfig {
    /// Sets the field bounds.
    pub fn bounds(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the number of obstacles.
    pub fn obstacle_count(mut self, obstacle_count: usize) -> Self {
        self.obstacle_count = obstacle_count;
        self
    }

    /// Sets the start position.
    pub fn start(mut self, x: f64, y: f64) -> Self {
        self.start = (x, y);
        self
    }
}

/// A field of randomly placed, non-overlapping obstacle rectangles.
///
/// The layout is immutable once built; a fresh layout is obtained by
/// building a new field with another seed.
pub struct RectField {
    width: f64,
    height: f64,
    start: (f64, f64),
    obstacles: Vec<Rect>,
}

impl RectField {
    /// The obstacle rectangles of the layout.
    pub fn obstacles(&self) -> &[Rect] {
        &self.obstacles
    }
}

impl Field for RectField {
    type Config = RectFieldConfig;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed as u64);
        let start_area = Rect {
            x: config.start.0 - config.start_clearance,
            y: config.start.1 - config.start_clearance,
            w: 2.0 * config.start_clearance,
            h: 2.0 * config.start_clearance,
        };

        let mut obstacles: Vec<Rect> = Vec::with_capacity(config.obstacle_count);
        for _ in 0..config.obstacle_count {
            let mut placed = false;
            for _ in 0..config.attempt_limit {
                let w = rng.gen_range(config.min_size..=config.max_size);
                let h = rng.gen_range(config.min_size..=config.max_size);
                let candidate = Rect {
                    x: rng.gen_range(0.0..=(config.width - w)),
                    y: rng.gen_range(0.0..=(config.height - h)),
                    w,
                    h,
                };
                if candidate.intersects(&start_area) {
                    continue;
                }
                if obstacles
                    .iter()
                    .all(|o| !candidate.intersects(&o.inflate(config.min_gap)))
                {
                    obstacles.push(candidate);
                    placed = true;
                    break;
                }
            }
            if !placed {
                warn!(
                    "Failed to place an obstacle after {} attempts",
                    config.attempt_limit
                );
            }
        }
        if obstacles.len() < config.obstacle_count {
            warn!(
                "Only {} out of {} obstacles were placed",
                obstacles.len(),
                config.obstacle_count
            );
        }

        Ok(Self {
            width: config.width,
            height: config.height,
            start: config.start,
            obstacles,
        })
    }

    fn bounds(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn is_obstacle(&self, x: f64, y: f64) -> bool {
        if x < 0.0 || y < 0.0 || x >= self.width || y >= self.height {
            return true;
        }
        self.obstacles.iter().any(|o| o.contains(x, y))
    }

    fn start_position(&self) -> (f64, f64) {
        self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_is_blocked() {
        let field = RectField::build(&RectFieldConfig::default(), 0).unwrap();
        assert!(field.is_obstacle(-1.0, 100.0));
        assert!(field.is_obstacle(100.0, -1.0));
        assert!(field.is_obstacle(1200.0, 100.0));
        assert!(field.is_obstacle(100.0, 800.0));
    }

    #[test]
    fn start_is_kept_clear() {
        for seed in 0..20 {
            let field = RectField::build(&RectFieldConfig::default(), seed).unwrap();
            let (sx, sy) = field.start_position();
            assert!(!field.is_obstacle(sx, sy), "seed {}", seed);
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let config = RectFieldConfig::default();
        let a = RectField::build(&config, 7).unwrap();
        let b = RectField::build(&config, 7).unwrap();
        assert_eq!(a.obstacles(), b.obstacles());
    }

    #[test]
    fn obstacles_keep_their_gap() {
        let config = RectFieldConfig::default();
        let field = RectField::build(&config, 3).unwrap();
        let obstacles = field.obstacles();
        for (i, a) in obstacles.iter().enumerate() {
            for b in obstacles.iter().skip(i + 1) {
                assert!(!a.intersects(&b.inflate(config.min_gap)));
            }
        }
    }
}
