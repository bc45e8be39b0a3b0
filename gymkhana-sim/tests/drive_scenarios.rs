//! End-to-end scenarios of the driving environment.
use anyhow::Result;
use gymkhana_core::Env;
use gymkhana_sim::{
    reward::RewardConfig, DriveAct, DriveEnv, DriveEnvConfig, Field, RectFieldConfig, RectField,
};

/// A fixed field with a wall plane to the right of the start.
struct WalledField {
    wall_x: f64,
}

#[derive(Clone, Default)]
struct WalledFieldConfig {
    wall_x: f64,
}

impl Field for WalledField {
    type Config = WalledFieldConfig;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            wall_x: config.wall_x,
        })
    }

    fn bounds(&self) -> (f64, f64) {
        (400.0, 400.0)
    }

    fn is_obstacle(&self, x: f64, y: f64) -> bool {
        if x < 0.0 || y < 0.0 || x >= 400.0 || y >= 400.0 {
            return true;
        }
        x >= self.wall_x
    }

    fn start_position(&self) -> (f64, f64) {
        (50.0, 200.0)
    }
}

#[test]
fn accelerating_in_the_open_keeps_driving_straight() -> Result<()> {
    // Empty field, start (100, 100), heading 0: x strictly increases each
    // step, y never changes, the episode does not end.
    let config = DriveEnvConfig::<RectFieldConfig>::default()
        .field(RectFieldConfig::default().obstacle_count(0));
    let mut env = DriveEnv::<RectField>::build(&config, 0)?;
    env.reset()?;
    let mut prev_x = env.frame().car.x;

    for _ in 0..5 {
        let (step, _) = env.step(&DriveAct::Accelerate);
        assert!(!step.is_done());
        let car = env.frame().car;
        assert!(car.x > prev_x);
        assert!((car.y - 100.0).abs() < 1e-9);
        // The observation leads with speed and heading.
        assert!(step.obs.0[0] > 0.0);
        assert_eq!(step.obs.0[1], 0.0);
        prev_x = car.x;
    }
    let (step, _) = env.step(&DriveAct::Decelerate);
    assert!(!step.is_done());
    Ok(())
}

#[test]
fn hitting_the_wall_ends_the_episode_with_the_terminal_penalty() -> Result<()> {
    // The wall plane sits within one step of the start: the first forward
    // step terminates with the terminal penalty.
    let config = DriveEnvConfig::<WalledFieldConfig> {
        field: WalledFieldConfig { wall_x: 50.4 },
        ..DriveEnvConfig::default()
    };
    let mut env = DriveEnv::<WalledField>::build(&config, 0)?;
    env.reset()?;

    let (step, _) = env.step(&DriveAct::Accelerate);
    assert!(step.is_terminated);
    assert_eq!(step.reward, -100.0);
    Ok(())
}

#[test]
fn blocked_start_position_is_rejected_at_build() {
    // A field whose declared start already lies on the wall is a fatal
    // configuration error, not a silent fallback.
    let config = DriveEnvConfig::<WalledFieldConfig> {
        field: WalledFieldConfig { wall_x: 40.0 },
        ..DriveEnvConfig::default()
    };
    assert!(DriveEnv::<WalledField>::build(&config, 0).is_err());
}

#[test]
fn disabling_the_terminal_penalty_changes_the_terminal_reward() -> Result<()> {
    let reward = RewardConfig {
        terminal_penalty: None,
        ..RewardConfig::default()
    };
    let config = DriveEnvConfig::<WalledFieldConfig> {
        field: WalledFieldConfig { wall_x: 50.4 },
        ..DriveEnvConfig::default()
    }
    .reward(reward);
    let mut env = DriveEnv::<WalledField>::build(&config, 0)?;
    env.reset()?;

    let (step, _) = env.step(&DriveAct::Accelerate);
    assert!(step.is_terminated);
    assert!(step.reward > -100.0);
    Ok(())
}

#[test]
fn resets_reproduce_the_initial_observation() -> Result<()> {
    let config = DriveEnvConfig::<RectFieldConfig>::default();
    let mut env = DriveEnv::<RectField>::build(&config, 3)?;
    let a = env.reset()?;
    env.step(&DriveAct::TurnLeftLarge);
    env.step(&DriveAct::Accelerate);
    let b = env.reset()?;
    assert_eq!(a, b);
    Ok(())
}
