//! The driving environment.
use crate::{
    car::{Car, DriveAct, KinematicsConfig},
    field::Field,
    grid::CellGrid,
    render::Frame,
    reward::{self, RewardConfig},
    sensor::{self, SensorConfig, SensorScan},
    SimError,
};
use anyhow::Result;
use gymkhana_core::{record::Record, Env, Step};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Fixed-width observation vector: speed, heading and the sensor
/// distances, zero-padded to the configured width. The width never varies
/// across steps of one configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DriveObs(pub Vec<f32>);

impl gymkhana_core::Obs for DriveObs {}

impl From<DriveObs> for Vec<f32> {
    fn from(obs: DriveObs) -> Self {
        obs.0
    }
}

/// Configuration of [`DriveEnv`], generic over the field configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DriveEnvConfig<FC> {
    /// Configuration of the obstacle field.
    pub field: FC,

    /// Configuration of the vehicle kinematics.
    pub kinematics: KinematicsConfig,

    /// Configuration of the sensor fan.
    pub sensor: SensorConfig,

    /// Configuration of the reward function.
    pub reward: RewardConfig,

    /// Width of the observation vector; at least 2 plus the number of
    /// rays.
    pub obs_dim: usize,

    /// Episode step limit; longer episodes are truncated.
    pub max_episode_steps: usize,

    /// Cell size of the visited-position grid.
    pub visited_cell_size: f64,
}

impl<FC: Default> Default for DriveEnvConfig<FC> {
    fn default() -> Self {
        Self {
            field: FC::default(),
            kinematics: KinematicsConfig::default(),
            sensor: SensorConfig::default(),
            reward: RewardConfig::default(),
            obs_dim: 14,
            max_episode_steps: 2000,
            visited_cell_size: 1.0,
        }
    }
}

impl<FC> DriveEnvConfig<FC> {
    /// Sets the field configuration.
    pub fn field(mut self, field: FC) -> Self {
        self.field = field;
        self
    }

    /// Sets the observation width.
    pub fn obs_dim(mut self, obs_dim: usize) -> Self {
        self.obs_dim = obs_dim;
        self
    }

    /// Sets the episode step limit.
    pub fn max_episode_steps(mut self, max_episode_steps: usize) -> Self {
        self.max_episode_steps = max_episode_steps;
        self
    }

    /// Sets the reward configuration.
    pub fn reward(mut self, reward: RewardConfig) -> Self {
        self.reward = reward;
        self
    }
}

impl<FC: Serialize + DeserializeOwned> DriveEnvConfig<FC> {
    /// Constructs [`DriveEnvConfig`] from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`DriveEnvConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// The driving environment.
///
/// A step applies the action to the kinematics, recomputes the sensor
/// scan, evaluates the collision state and the reward, in that order. The
/// episode terminates on collision and truncates at the step limit; in
/// either case the environment must be reset before the next step.
pub struct DriveEnv<F: Field> {
    field_config: F::Config,
    kinematics: KinematicsConfig,
    sensor: SensorConfig,
    reward: RewardConfig,
    obs_dim: usize,
    max_episode_steps: usize,
    seed: i64,
    field: F,
    pub(crate) car: Car,
    scan: SensorScan,
    visited: CellGrid,
    steps: usize,
    terminated: bool,
}

impl<F: Field> DriveEnv<F> {
    fn rescan(&mut self) {
        self.scan = sensor::scan(
            self.car.x,
            self.car.y,
            self.car.heading,
            &self.field,
            &self.sensor,
        );
    }

    fn observation(&self) -> DriveObs {
        let mut v = Vec::with_capacity(self.obs_dim);
        v.push(self.car.speed as f32);
        v.push(self.car.heading as f32);
        v.extend(self.scan.rays.iter().map(|r| r.distance as f32));
        v.resize(self.obs_dim, 0.0);
        DriveObs(v)
    }

    fn check_start(field: &F, kinematics: &KinematicsConfig) -> Result<(f64, f64), SimError> {
        let (sx, sy) = field.start_position();
        let probe = Car::new(sx, sy, kinematics);
        if probe.detect_collision(field) {
            return Err(SimError::BlockedStart { x: sx, y: sy });
        }
        Ok((sx, sy))
    }

    /// Returns true if the episode has ended and the environment awaits a
    /// reset.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// A read-only view of the current simulation state for rendering.
    pub fn frame(&self) -> Frame<'_, F> {
        Frame {
            field: &self.field,
            car: &self.car,
            scan: &self.scan,
            visited: &self.visited,
        }
    }
}

impl<F: Field> Env for DriveEnv<F> {
    type Config = DriveEnvConfig<F::Config>;
    type Obs = DriveObs;
    type Act = DriveAct;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        let n_rays = config.sensor.n_rays();
        if n_rays < 3 {
            return Err(SimError::TooFewRays(n_rays).into());
        }
        if config.obs_dim < 2 + n_rays {
            return Err(SimError::ObsDimTooSmall {
                obs_dim: config.obs_dim,
                n_rays,
            }
            .into());
        }

        let field = F::build(&config.field, seed)?;
        let (sx, sy) = Self::check_start(&field, &config.kinematics)?;

        let mut env = Self {
            field_config: config.field.clone(),
            kinematics: config.kinematics.clone(),
            sensor: config.sensor.clone(),
            reward: config.reward.clone(),
            obs_dim: config.obs_dim,
            max_episode_steps: config.max_episode_steps,
            seed,
            field,
            car: Car::new(sx, sy, &config.kinematics),
            scan: SensorScan::default(),
            visited: CellGrid::new(config.visited_cell_size),
            steps: 0,
            terminated: false,
        };
        env.rescan();
        Ok(env)
    }

    fn reset(&mut self) -> Result<DriveObs> {
        let (sx, sy) = self.field.start_position();
        self.car.reset(sx, sy);
        self.visited.clear();
        self.steps = 0;
        self.terminated = false;
        self.rescan();
        Ok(self.observation())
    }

    /// Regenerates the obstacle layout from a seed derived from the index,
    /// then resets.
    fn reset_with_index(&mut self, ix: usize) -> Result<DriveObs> {
        self.field = F::build(&self.field_config, self.seed + 1 + ix as i64)?;
        Self::check_start(&self.field, &self.kinematics)?;
        self.reset()
    }

    /// Performs an environment step.
    ///
    /// # Panics
    ///
    /// Panics when called on a terminated episode. The caller must reset
    /// first; continuing silently would hide an agent-loop bug.
    fn step(&mut self, a: &DriveAct) -> (Step<Self>, Record) {
        assert!(
            !self.terminated,
            "step() called on a terminated episode; call reset() first"
        );

        self.car.apply(*a, &self.kinematics);
        self.car.advance();
        self.rescan();
        if self.car.detect_collision(&self.field) {
            self.car.alive = false;
        }
        self.steps += 1;

        let is_terminated = !self.car.alive;
        let is_truncated = !is_terminated && self.steps >= self.max_episode_steps;
        let reward =
            reward::evaluate(&self.reward, &self.car, &self.scan, &mut self.visited) as f32;
        self.terminated = is_terminated || is_truncated;

        let step = Step::new(
            self.observation(),
            *a,
            reward,
            is_terminated,
            is_truncated,
            (),
            None,
        );
        (step, Record::empty())
    }

    fn step_with_reset(&mut self, a: &DriveAct) -> (Step<Self>, Record) {
        let (mut step, record) = self.step(a);
        if step.is_done() {
            let obs = self
                .reset()
                .expect("reset of a validated start position cannot fail");
            step.init_obs = Some(obs);
        }
        (step, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{RectField, RectFieldConfig};

    fn empty_env() -> DriveEnv<RectField> {
        let config = DriveEnvConfig::<RectFieldConfig>::default()
            .field(RectFieldConfig::default().obstacle_count(0));
        DriveEnv::build(&config, 0).unwrap()
    }

    #[test]
    fn observation_width_is_constant() {
        let mut env = empty_env();
        let obs = env.reset().unwrap();
        assert_eq!(obs.0.len(), 14);
        for _ in 0..5 {
            let (step, _) = env.step(&DriveAct::Accelerate);
            assert_eq!(step.obs.0.len(), 14);
        }
    }

    #[test]
    fn obs_dim_must_hold_the_encoding() {
        let config = DriveEnvConfig::<RectFieldConfig>::default().obs_dim(13);
        assert!(DriveEnv::<RectField>::build(&config, 0).is_err());
    }

    #[test]
    fn first_step_after_reset_is_not_done() {
        let mut env = empty_env();
        env.reset().unwrap();
        let (step, _) = env.step(&DriveAct::Decelerate);
        assert!(!step.is_done());
    }

    #[test]
    #[should_panic(expected = "terminated episode")]
    fn step_after_termination_panics() {
        let config = DriveEnvConfig::<RectFieldConfig>::default()
            .field(RectFieldConfig::default().obstacle_count(0))
            .max_episode_steps(1);
        let mut env = DriveEnv::<RectField>::build(&config, 0).unwrap();
        env.reset().unwrap();
        let (step, _) = env.step(&DriveAct::Accelerate);
        assert!(step.is_truncated);
        let _ = env.step(&DriveAct::Accelerate);
    }

    #[test]
    fn blocked_start_is_a_build_error() {
        // Start placed outside the field: the bounding rectangle crosses
        // the boundary and construction must fail loudly.
        let config = DriveEnvConfig::<RectFieldConfig>::default()
            .field(RectFieldConfig::default().obstacle_count(0).start(2.0, 2.0));
        assert!(DriveEnv::<RectField>::build(&config, 0).is_err());
    }

    #[test]
    fn accelerating_moves_along_x() {
        // Empty field, start (100, 100), heading 0: x strictly increases
        // while y stays put and the car stays alive.
        let mut env = empty_env();
        env.reset().unwrap();
        let mut x = env.car.x;
        for _ in 0..5 {
            let (step, _) = env.step(&DriveAct::Accelerate);
            assert!(!step.is_terminated);
            assert!(env.car.alive);
            assert!(env.car.x > x);
            assert!((env.car.y - 100.0).abs() < 1e-9);
            x = env.car.x;
        }
        let (step, _) = env.step(&DriveAct::Decelerate);
        assert!(!step.is_terminated);
    }

    #[test]
    fn driving_into_the_wall_terminates_with_penalty() {
        let mut env = empty_env();
        env.reset().unwrap();
        let mut last = None;
        for _ in 0..2000 {
            if env.is_terminated() {
                break;
            }
            let (step, _) = env.step(&DriveAct::Accelerate);
            last = Some((step.reward, step.is_terminated));
        }
        let (reward, is_terminated) = last.unwrap();
        assert!(is_terminated);
        assert_eq!(reward, -100.0);
    }

    #[test]
    fn reset_clears_the_visited_grid() {
        let mut env = empty_env();
        env.reset().unwrap();
        env.step(&DriveAct::Accelerate);
        env.step(&DriveAct::Accelerate);
        assert!(!env.visited.is_empty());
        env.reset().unwrap();
        assert!(env.visited.is_empty());
    }
}
