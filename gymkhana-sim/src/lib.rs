//! Driving simulation environment.
//!
//! A car moves through a bounded field of obstacles, sensing its
//! surroundings with a fixed fan of distance rays. [`DriveEnv`] composes
//! vehicle kinematics, ray-cast sensing, collision detection and a
//! multi-term shaped reward into an environment implementing
//! [`gymkhana_core::Env`], generic over the [`Field`] providing the
//! obstacle layout.
//!
//! The crate is independent of any tensor backend. The `candle` feature
//! adds the observation/action tensor conversions used by candle-based
//! agents.
pub mod car;
pub mod env;
pub mod field;
pub mod grid;
pub mod render;
pub mod reward;
pub mod sensor;

mod error;
pub use error::SimError;

#[cfg(feature = "candle")]
mod tensor;

pub use car::{Car, DriveAct, KinematicsConfig};
pub use env::{DriveEnv, DriveEnvConfig, DriveObs};
pub use field::{Field, MazeField, MazeFieldConfig, RectField, RectFieldConfig};
