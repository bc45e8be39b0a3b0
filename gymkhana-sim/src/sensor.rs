//! Ray-cast distance sensing.
use crate::field::Field;
use serde::{Deserialize, Serialize};

/// Configuration of the sensor fan.
///
/// The same configuration must be used for the state encoding and for
/// rendering; the number of rays fixes part of the observation width.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SensorConfig {
    /// Ray angles in degrees, relative to the car's heading.
    pub angles: Vec<f64>,

    /// Maximum ray length in units.
    pub max_range: f64,
}

impl Default for SensorConfig {
    /// Twelve rays, one every 30 degrees, with a range of 100 units.
    fn default() -> Self {
        Self {
            angles: (0..12).map(|i| (i * 30) as f64).collect(),
            max_range: 100.0,
        }
    }
}

impl SensorConfig {
    /// Number of configured rays.
    pub fn n_rays(&self) -> usize {
        self.angles.len()
    }
}

/// One ray reading: the point where the ray stopped and the distance
/// traveled, rounded to whole units.
#[derive(Clone, Debug, PartialEq)]
pub struct Ray {
    /// The stopping point of the ray.
    pub hit: (f64, f64),

    /// Euclidean distance from the car center to the stopping point.
    pub distance: f64,
}

/// An ordered set of ray readings, one per configured angle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SensorScan {
    /// Readings in the order of the configured angles.
    pub rays: Vec<Ray>,
}

impl SensorScan {
    /// The minimum distance over all rays.
    pub fn min_distance(&self) -> f64 {
        self.rays
            .iter()
            .map(|r| r.distance)
            .fold(f64::INFINITY, f64::min)
    }

    /// Sums of the ray distances over the left, forward and right thirds
    /// of the fan.
    pub fn thirds(&self) -> (f64, f64, f64) {
        let n = self.rays.len();
        let third = n / 3;
        let sum = |rays: &[Ray]| rays.iter().map(|r| r.distance).sum::<f64>();
        let left = sum(&self.rays[..third]);
        let right = sum(&self.rays[n - third..]);
        let forward = sum(&self.rays[third..n - third]);
        (left, forward, right)
    }
}

/// Casts the configured fan of rays from `(cx, cy)`.
///
/// Each ray is stepped outward in unit increments up to the maximum range
/// and stops early at the first obstacle point or at the field boundary.
/// The scan is deterministic: identical pose, field and configuration give
/// identical readings.
pub fn scan<F: Field>(cx: f64, cy: f64, heading: f64, field: &F, config: &SensorConfig) -> SensorScan {
    let (w, h) = field.bounds();
    let mut rays = Vec::with_capacity(config.angles.len());

    for angle in &config.angles {
        let rad = (heading + angle).to_radians();
        let (dx, dy) = (rad.cos(), rad.sin());
        let (mut px, mut py) = (cx, cy);
        let mut len = 0.0;

        while len < config.max_range {
            len += 1.0;
            px = cx + dx * len;
            py = cy + dy * len;
            if px < 0.0 || py < 0.0 || px >= w || py >= h {
                break;
            }
            if field.is_obstacle(px, py) {
                break;
            }
        }

        let distance = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt().round();
        rays.push(Ray {
            hit: (px, py),
            distance,
        });
    }

    SensorScan { rays }
}
