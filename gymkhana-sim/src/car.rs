//! Vehicle kinematics and collision detection.
use crate::{field::Field, SimError};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Discrete control actions of the car.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveAct {
    /// Small turn to the left.
    TurnLeftSmall,
    /// Large turn to the left.
    TurnLeftLarge,
    /// Small turn to the right.
    TurnRightSmall,
    /// Large turn to the right.
    TurnRightLarge,
    /// Increase speed by one increment.
    Accelerate,
    /// Decrease speed by one increment.
    Decelerate,
    /// Back up at a small bounded speed.
    Reverse,
}

impl DriveAct {
    /// Number of actions in the discrete set.
    pub const N: usize = 7;

    /// All actions, in index order.
    pub const ALL: [DriveAct; DriveAct::N] = [
        DriveAct::TurnLeftSmall,
        DriveAct::TurnLeftLarge,
        DriveAct::TurnRightSmall,
        DriveAct::TurnRightLarge,
        DriveAct::Accelerate,
        DriveAct::Decelerate,
        DriveAct::Reverse,
    ];

    /// Index of the action within the discrete set.
    pub fn index(self) -> i64 {
        Self::ALL.iter().position(|a| *a == self).unwrap() as i64
    }
}

impl TryFrom<i64> for DriveAct {
    type Error = SimError;

    /// Fails on indices outside the action set; a malformed index is never
    /// clamped.
    fn try_from(ix: i64) -> Result<Self, SimError> {
        usize::try_from(ix)
            .ok()
            .and_then(|ix| Self::ALL.get(ix).copied())
            .ok_or(SimError::InvalidAction(ix))
    }
}

impl gymkhana_core::Act for DriveAct {}

/// Configuration of the vehicle kinematics.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KinematicsConfig {
    /// Heading change of a small turn, in degrees.
    pub turn_small: f64,

    /// Heading change of a large turn, in degrees.
    pub turn_large: f64,

    /// Speed change of accelerate/decelerate.
    pub accel: f64,

    /// Lower speed bound. May be negative to allow rolling backwards.
    pub min_speed: f64,

    /// Upper speed bound.
    pub max_speed: f64,

    /// Magnitude bound of the reverse speed.
    pub reverse_cap: f64,

    /// Width of the car's bounding rectangle.
    pub body_width: f64,

    /// Height of the car's bounding rectangle.
    pub body_height: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            turn_small: 1.0,
            turn_large: 3.0,
            accel: 0.5,
            min_speed: -2.0,
            max_speed: 10.0,
            reverse_cap: 2.0,
            body_width: 10.0,
            body_height: 10.0,
        }
    }
}

/// The simulated vehicle.
///
/// The pose stores the center of the car's bounding rectangle. `alive`
/// latches to false on the first collision and stays false until
/// [`Car::reset`].
#[derive(Clone, Debug)]
pub struct Car {
    /// x coordinate of the center.
    pub x: f64,
    /// y coordinate of the center.
    pub y: f64,
    /// Heading in degrees. Not normalized; the trigonometric functions are
    /// periodic.
    pub heading: f64,
    /// Signed speed in units per step.
    pub speed: f64,
    /// False once the car has collided or left the field.
    pub alive: bool,
    half_w: f64,
    half_h: f64,
}

impl Car {
    /// Creates a car at the given position.
    pub fn new(x: f64, y: f64, config: &KinematicsConfig) -> Self {
        Self {
            x,
            y,
            heading: 0.0,
            speed: 0.0,
            alive: true,
            half_w: config.body_width / 2.0,
            half_h: config.body_height / 2.0,
        }
    }

    /// Re-poses the car at the given position with zero heading and speed.
    pub fn reset(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.heading = 0.0;
        self.speed = 0.0;
        self.alive = true;
    }

    /// Applies an action to heading and speed.
    pub fn apply(&mut self, act: DriveAct, config: &KinematicsConfig) {
        match act {
            DriveAct::TurnLeftSmall => self.heading += config.turn_small,
            DriveAct::TurnLeftLarge => self.heading += config.turn_large,
            DriveAct::TurnRightSmall => self.heading -= config.turn_small,
            DriveAct::TurnRightLarge => self.heading -= config.turn_large,
            DriveAct::Accelerate => {
                self.speed = (self.speed + config.accel).clamp(config.min_speed, config.max_speed)
            }
            DriveAct::Decelerate => {
                self.speed = (self.speed - config.accel).clamp(config.min_speed, config.max_speed)
            }
            DriveAct::Reverse => self.speed = -self.speed.abs().min(config.reverse_cap),
        }
    }

    /// Integrates heading and speed into the position.
    pub fn advance(&mut self) {
        let rad = self.heading.to_radians();
        self.x += rad.cos() * self.speed;
        self.y += rad.sin() * self.speed;
    }

    /// Returns true if the bounding rectangle crosses the field boundary or
    /// the center lies on an obstacle.
    pub fn detect_collision<F: Field>(&self, field: &F) -> bool {
        let (w, h) = field.bounds();
        if self.x - self.half_w < 0.0
            || self.x + self.half_w > w
            || self.y - self.half_h < 0.0
            || self.y + self.half_h > h
        {
            return true;
        }
        field.is_obstacle(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, RectField, RectFieldConfig};

    fn empty_field() -> RectField {
        let config = RectFieldConfig::default().obstacle_count(0);
        RectField::build(&config, 0).unwrap()
    }

    #[test]
    fn action_index_roundtrip() {
        for act in DriveAct::ALL {
            assert_eq!(DriveAct::try_from(act.index()).unwrap(), act);
        }
        assert!(DriveAct::try_from(7).is_err());
        assert!(DriveAct::try_from(-1).is_err());
    }

    #[test]
    fn speed_is_clamped() {
        let config = KinematicsConfig::default();
        let mut car = Car::new(100.0, 100.0, &config);
        for _ in 0..100 {
            car.apply(DriveAct::Accelerate, &config);
        }
        assert_eq!(car.speed, config.max_speed);
        for _ in 0..100 {
            car.apply(DriveAct::Decelerate, &config);
        }
        assert_eq!(car.speed, config.min_speed);
    }

    #[test]
    fn reverse_is_bounded() {
        let config = KinematicsConfig::default();
        let mut car = Car::new(100.0, 100.0, &config);
        for _ in 0..100 {
            car.apply(DriveAct::Accelerate, &config);
        }
        car.apply(DriveAct::Reverse, &config);
        assert_eq!(car.speed, -config.reverse_cap);
    }

    #[test]
    fn heading_zero_moves_along_x() {
        let config = KinematicsConfig::default();
        let mut car = Car::new(100.0, 100.0, &config);
        car.apply(DriveAct::Accelerate, &config);
        car.advance();
        assert!(car.x > 100.0);
        assert!((car.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn interior_pose_does_not_collide() {
        let field = empty_field();
        let car = Car::new(100.0, 100.0, &KinematicsConfig::default());
        assert!(!car.detect_collision(&field));
    }

    #[test]
    fn crossing_the_boundary_collides() {
        let field = empty_field();
        let config = KinematicsConfig::default();
        for (x, y) in [(3.0, 100.0), (1198.0, 100.0), (100.0, 3.0), (100.0, 798.0)] {
            let car = Car::new(x, y, &config);
            assert!(car.detect_collision(&field), "({}, {})", x, y);
        }
    }
}
