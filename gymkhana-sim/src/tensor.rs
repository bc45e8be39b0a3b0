//! Tensor conversions for candle-based agents.
use crate::{car::DriveAct, env::DriveObs};
use candle_core::{Device, Tensor};
use std::convert::TryFrom;

impl From<DriveObs> for Tensor {
    /// Returns a tensor of shape `[1, obs_dim]`.
    fn from(obs: DriveObs) -> Tensor {
        let n = obs.0.len();
        Tensor::from_vec(obs.0, (1, n), &Device::Cpu)
            .expect("Failed to convert DriveObs to Tensor")
    }
}

impl From<Tensor> for DriveAct {
    /// `t` must be a 1-dimensional `i64` tensor holding one action index.
    ///
    /// Panics on an index outside the action set: a malformed action
    /// indicates a bug in the agent or the network and must surface
    /// immediately instead of being clamped.
    fn from(t: Tensor) -> Self {
        let data = t
            .to_vec1::<i64>()
            .expect("Failed to convert Tensor to DriveAct");
        let ix = data[0];
        DriveAct::try_from(ix)
            .unwrap_or_else(|_| panic!("invalid action index {} from the policy network", ix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obs_converts_with_batch_dim() {
        let t: Tensor = DriveObs(vec![0.5; 14]).into();
        assert_eq!(t.dims(), &[1, 14]);
    }

    #[test]
    fn act_roundtrips_through_tensor() {
        for act in DriveAct::ALL {
            let t = Tensor::from_vec(vec![act.index()], (1,), &Device::Cpu).unwrap();
            assert_eq!(DriveAct::from(t), act);
        }
    }

    #[test]
    #[should_panic(expected = "invalid action index")]
    fn out_of_range_index_panics() {
        let t = Tensor::from_vec(vec![7i64], (1,), &Device::Cpu).unwrap();
        let _ = DriveAct::from(t);
    }
}
