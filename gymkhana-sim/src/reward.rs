//! Multi-term reward shaping.
//!
//! The reward is a sum of independent terms, each of which can be disabled
//! by setting its configuration entry to `None`. The terminal penalty is
//! checked first and, with `short_circuit` set, returned alone.
use crate::{car::Car, grid::CellGrid, sensor::SensorScan};
use serde::{Deserialize, Serialize};

/// Penalty for closing in on obstacles, scaled by how far the minimum ray
/// distance falls below the threshold.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProximityPenalty {
    /// Distance below which the penalty applies.
    pub threshold: f64,
    /// Penalty per unit of shortfall.
    pub scale: f64,
}

/// Fixed bonus for keeping all obstacles beyond a safe distance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SafeDistanceBonus {
    /// Distance beyond which the bonus applies.
    pub threshold: f64,
    /// Bonus value.
    pub bonus: f64,
}

/// Bonus for entering unvisited cells, penalty for revisits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExplorationBonus {
    /// Bonus on the first visit of a cell in the episode.
    pub bonus: f64,
    /// Penalty on revisits.
    pub revisit_penalty: f64,
}

/// Bonus for heading towards the most open third of the sensor fan.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DirectionalBonus {
    /// Bonus when the forward third is the most open (ties included).
    pub forward: f64,
    /// Bonus when a side third is the most open.
    pub side: f64,
}

/// Configuration of the reward function.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RewardConfig {
    /// Penalty applied when the car is no longer alive. Dominates all
    /// other terms.
    pub terminal_penalty: Option<f64>,

    /// Return the terminal penalty alone instead of summing the remaining
    /// terms on top of it.
    pub short_circuit: bool,

    /// Proximity penalty term.
    pub proximity: Option<ProximityPenalty>,

    /// Safe-distance bonus term.
    pub safe_distance: Option<SafeDistanceBonus>,

    /// Bonus per unit of forward speed.
    pub movement_scale: Option<f64>,

    /// Exploration term over the visited-cell grid.
    pub exploration: Option<ExplorationBonus>,

    /// Directional open-space term.
    pub directional: Option<DirectionalBonus>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            terminal_penalty: Some(100.0),
            short_circuit: true,
            proximity: Some(ProximityPenalty {
                threshold: 35.0,
                scale: 2.0,
            }),
            safe_distance: Some(SafeDistanceBonus {
                threshold: 50.0,
                bonus: 5.0,
            }),
            movement_scale: Some(0.1),
            exploration: Some(ExplorationBonus {
                bonus: 10.0,
                revisit_penalty: 1.0,
            }),
            directional: Some(DirectionalBonus {
                forward: 2.0,
                side: 1.0,
            }),
        }
    }
}

/// Evaluates the reward for the car's current state.
///
/// Pure in its inputs except for inserting the car's discretized position
/// into `visited`.
pub fn evaluate(
    config: &RewardConfig,
    car: &Car,
    scan: &SensorScan,
    visited: &mut CellGrid,
) -> f64 {
    let mut reward = 0.0;

    // The terminal penalty dominates and is checked before anything else.
    if !car.alive {
        if let Some(penalty) = config.terminal_penalty {
            if config.short_circuit {
                return -penalty;
            }
            reward -= penalty;
        }
    }

    let min_distance = scan.min_distance();

    if let Some(p) = &config.proximity {
        if min_distance < p.threshold {
            reward -= (p.threshold - min_distance) * p.scale;
        }
    }

    if let Some(s) = &config.safe_distance {
        if min_distance > s.threshold {
            reward += s.bonus;
        }
    }

    if let Some(scale) = config.movement_scale {
        if car.speed > 0.0 {
            reward += car.speed * scale;
        }
    }

    if let Some(e) = &config.exploration {
        if visited.mark_visited(car.x, car.y) {
            reward += e.bonus;
        } else {
            reward -= e.revisit_penalty;
        }
    }

    if let Some(d) = &config.directional {
        let (left, forward, right) = scan.thirds();
        if forward >= left.max(right) {
            reward += d.forward;
        } else {
            reward += d.side;
        }
    }

    reward
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{car::KinematicsConfig, sensor::Ray};

    fn car_at(x: f64, y: f64) -> Car {
        Car::new(x, y, &KinematicsConfig::default())
    }

    fn uniform_scan(distance: f64) -> SensorScan {
        SensorScan {
            rays: (0..12)
                .map(|_| Ray {
                    hit: (0.0, 0.0),
                    distance,
                })
                .collect(),
        }
    }

    #[test]
    fn terminal_penalty_short_circuits() {
        let config = RewardConfig::default();
        let mut car = car_at(100.0, 100.0);
        car.alive = false;
        let mut grid = CellGrid::new(1.0);
        let r = evaluate(&config, &car, &uniform_scan(100.0), &mut grid);
        assert_eq!(r, -100.0);
        // The short circuit skips the visited-set side effect.
        assert!(grid.is_empty());
    }

    #[test]
    fn terminal_penalty_dominates_without_short_circuit() {
        let config = RewardConfig {
            short_circuit: false,
            ..RewardConfig::default()
        };
        let mut car = car_at(100.0, 100.0);
        car.alive = false;
        let mut grid = CellGrid::new(1.0);
        let r = evaluate(&config, &car, &uniform_scan(100.0), &mut grid);
        assert!(r < 0.0);
        assert!(r > -100.0 - 50.0);
    }

    #[test]
    fn first_visit_beats_revisit() {
        let config = RewardConfig::default();
        let car = car_at(100.0, 100.0);
        let scan = uniform_scan(100.0);
        let mut grid = CellGrid::new(1.0);
        let first = evaluate(&config, &car, &scan, &mut grid);
        let second = evaluate(&config, &car, &scan, &mut grid);
        assert_eq!(first - second, 10.0 + 1.0);
    }

    #[test]
    fn proximity_penalty_scales_with_shortfall() {
        let config = RewardConfig {
            safe_distance: None,
            movement_scale: None,
            exploration: None,
            directional: None,
            ..RewardConfig::default()
        };
        let car = car_at(100.0, 100.0);
        let mut grid = CellGrid::new(1.0);
        let near = evaluate(&config, &car, &uniform_scan(5.0), &mut grid);
        let far = evaluate(&config, &car, &uniform_scan(30.0), &mut grid);
        assert_eq!(near, -(35.0 - 5.0) * 2.0);
        assert_eq!(far, -(35.0 - 30.0) * 2.0);
    }

    #[test]
    fn disabled_terms_contribute_nothing() {
        let config = RewardConfig {
            terminal_penalty: None,
            short_circuit: true,
            proximity: None,
            safe_distance: None,
            movement_scale: None,
            exploration: None,
            directional: None,
        };
        let mut car = car_at(100.0, 100.0);
        car.alive = false;
        let mut grid = CellGrid::new(1.0);
        assert_eq!(evaluate(&config, &car, &uniform_scan(1.0), &mut grid), 0.0);
    }

    #[test]
    fn directional_tie_goes_forward() {
        let config = RewardConfig {
            terminal_penalty: None,
            proximity: None,
            safe_distance: None,
            movement_scale: None,
            exploration: None,
            ..RewardConfig::default()
        };
        let car = car_at(100.0, 100.0);
        let mut grid = CellGrid::new(1.0);
        // All thirds equal: the forward bonus must win the tie.
        let r = evaluate(&config, &car, &uniform_scan(50.0), &mut grid);
        assert_eq!(r, 2.0);
    }

    #[test]
    fn movement_bonus_tracks_speed() {
        let config = RewardConfig {
            terminal_penalty: None,
            proximity: None,
            safe_distance: None,
            exploration: None,
            directional: None,
            ..RewardConfig::default()
        };
        let mut car = car_at(100.0, 100.0);
        let mut grid = CellGrid::new(1.0);
        car.speed = 4.0;
        let slow = evaluate(&config, &car, &uniform_scan(100.0), &mut grid);
        car.speed = 8.0;
        let fast = evaluate(&config, &car, &uniform_scan(100.0), &mut grid);
        assert!(fast > slow);
        car.speed = -2.0;
        assert_eq!(evaluate(&config, &car, &uniform_scan(100.0), &mut grid), 0.0);
    }
}
