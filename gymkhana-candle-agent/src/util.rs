//! Utilities.
use anyhow::Result;
use candle_core::{DType, Device, Tensor, WithDType};
use candle_nn::VarMap;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Critic loss type.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum CriticLoss {
    /// Mean squared error.
    Mse,

    /// Smooth L1 loss.
    SmoothL1,
}

/// Applies a soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    let dest = dest.data().lock().unwrap();
    let src = src.data().lock().unwrap();

    dest.iter().for_each(|(k_dest, v_dest)| {
        let v_src = src.get(k_dest).unwrap();
        let t_src = v_src.as_tensor();
        let t_dest = v_dest.as_tensor();
        let t_dest = ((tau * t_src).unwrap() + (1.0 - tau) * t_dest).unwrap();
        v_dest.set(&t_dest).unwrap();
    });

    Ok(())
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> usize;

    /// Sets the output dimension.
    fn set_out_dim(&mut self, v: usize);
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let device = x.device();
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?.to_device(device)?;
    let m2 = Tensor::try_from(1f32)?
        .to_device(device)?
        .broadcast_sub(&m1)?;
    (((0.5 * m1)? * d.powf(2.0)?)? + (m2 * (d - 0.5)?)?)?.mean_all()
}

/// Converts a vector into a tensor, optionally with a leading batch
/// dimension of one.
pub fn vec_to_tensor<T: WithDType>(v: Vec<T>, add_batch_dim: bool) -> Result<Tensor> {
    let n = v.len();
    let t = Tensor::from_vec(v, n, &Device::Cpu)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::Init;

    #[test]
    fn test_track() -> Result<()> {
        let tau = 0.7;
        let t_src = Tensor::from_slice(&[1.0f32, 2.0, 3.0], (3,), &Device::Cpu)?;
        let t_dest = Tensor::from_slice(&[4.0f32, 5.0, 6.0], (3,), &Device::Cpu)?;
        let t = ((tau * &t_src).unwrap() + (1.0 - tau) * &t_dest).unwrap();

        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        let vm_src = {
            let vm = VarMap::new();
            vm.get((3,), "var1", init, DType::F32, &Device::Cpu)?;
            vm.data().lock().unwrap().get("var1").unwrap().set(&t_src)?;
            vm
        };
        let vm_dest = {
            let vm = VarMap::new();
            vm.get((3,), "var1", init, DType::F32, &Device::Cpu)?;
            vm.data()
                .lock()
                .unwrap()
                .get("var1")
                .unwrap()
                .set(&t_dest)?;
            vm
        };
        track(&vm_dest, &vm_src, tau)?;

        let t_ = vm_dest
            .data()
            .lock()
            .unwrap()
            .get("var1")
            .unwrap()
            .as_tensor()
            .clone();

        assert!((t - t_)?.abs()?.sum(0)?.to_scalar::<f32>()? < 1e-6);

        Ok(())
    }

    #[test]
    fn smooth_l1_matches_mse_region() -> Result<(), candle_core::Error> {
        // Inside |x - y| < 1 the loss is 0.5 * (x - y)^2.
        let x = Tensor::from_slice(&[0.5f32], (1,), &Device::Cpu)?;
        let y = Tensor::from_slice(&[0.0f32], (1,), &Device::Cpu)?;
        let loss = smooth_l1_loss(&x, &y)?.to_scalar::<f32>()?;
        assert!((loss - 0.125).abs() < 1e-6);
        Ok(())
    }
}
