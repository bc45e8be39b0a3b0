//! Noisy linear network for parameter-space exploration.
//!
//! Each layer holds mean and sigma parameters for weights and biases and,
//! in training mode, perturbs them with factorized Gaussian noise. The
//! noise is resampled on every training-mode forward pass, so a fresh
//! perturbation is drawn before each greedy action evaluation. In
//! evaluation mode only the mean parameters are used.
use crate::{model::SubModel1, util::OutDim};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Init, VarBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`NoisyMlp`].
pub struct NoisyMlpConfig {
    pub(super) in_dim: usize,
    pub(super) units: Vec<usize>,
    pub(super) out_dim: usize,
    /// Initial value of the noise scale parameters.
    pub sigma_init: f64,
}

impl NoisyMlpConfig {
    /// Creates configuration of a noisy MLP with the given hidden unit
    /// counts.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            sigma_init: 0.017,
        }
    }
}

impl OutDim for NoisyMlpConfig {
    fn get_out_dim(&self) -> usize {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: usize) {
        self.out_dim = out_dim;
    }
}

struct NoisyLinear {
    weight_mu: Tensor,
    weight_sigma: Tensor,
    bias_mu: Tensor,
    bias_sigma: Tensor,
    in_dim: usize,
    out_dim: usize,
}

impl NoisyLinear {
    fn build(vs: VarBuilder, in_dim: usize, out_dim: usize, sigma_init: f64) -> Self {
        let bound = 1.0 / (in_dim as f64).sqrt();
        let uniform = Init::Uniform {
            lo: -bound,
            up: bound,
        };
        let weight_mu = vs
            .get_with_hints((out_dim, in_dim), "weight_mu", uniform)
            .unwrap();
        let weight_sigma = vs
            .get_with_hints((out_dim, in_dim), "weight_sigma", Init::Const(sigma_init))
            .unwrap();
        let bias_mu = vs.get_with_hints(out_dim, "bias_mu", uniform).unwrap();
        let bias_sigma = vs
            .get_with_hints(out_dim, "bias_sigma", Init::Const(sigma_init))
            .unwrap();

        Self {
            weight_mu,
            weight_sigma,
            bias_mu,
            bias_sigma,
            in_dim,
            out_dim,
        }
    }

    /// Factorized noise: `sign(x) * sqrt(|x|)` over standard normal draws.
    fn scale_noise(n: usize, device: &Device) -> Tensor {
        let x = Tensor::randn(0f32, 1f32, n, device).unwrap();
        let sign = ((x.ge(0f32).unwrap().to_dtype(DType::F32).unwrap() * 2.0).unwrap() - 1.0)
            .unwrap();
        (sign * x.abs().unwrap().sqrt().unwrap()).unwrap()
    }

    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let (weight, bias) = if train {
            let device = self.weight_mu.device();
            let eps_in = Self::scale_noise(self.in_dim, device);
            let eps_out = Self::scale_noise(self.out_dim, device);
            let weight_eps = eps_out
                .reshape((self.out_dim, 1))
                .unwrap()
                .broadcast_mul(&eps_in.reshape((1, self.in_dim)).unwrap())
                .unwrap();
            let weight = (&self.weight_mu + (&self.weight_sigma * &weight_eps).unwrap()).unwrap();
            let bias = (&self.bias_mu + (&self.bias_sigma * &eps_out).unwrap()).unwrap();
            (weight, bias)
        } else {
            (self.weight_mu.clone(), self.bias_mu.clone())
        };

        xs.matmul(&weight.t().unwrap())
            .unwrap()
            .broadcast_add(&bias)
            .unwrap()
    }
}

/// Multilayer perceptron of noisy linear layers with ReLU activations.
pub struct NoisyMlp {
    device: Device,
    layers: Vec<NoisyLinear>,
}

impl NoisyMlp {
    fn forward_layers(&self, xs: &Tensor, train: bool) -> Tensor {
        let n_layers = self.layers.len();
        let mut xs = xs.to_device(&self.device).unwrap();

        for layer in &self.layers[..n_layers - 1] {
            xs = layer.forward_t(&xs, train).relu().unwrap();
        }

        self.layers[n_layers - 1].forward_t(&xs, train)
    }
}

impl SubModel1 for NoisyMlp {
    type Config = NoisyMlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(vs: VarBuilder, config: Self::Config) -> Self {
        let device = vs.device().clone();
        let mut in_out_pairs: Vec<(usize, usize)> = (0..config.units.len() - 1)
            .map(|i| (config.units[i], config.units[i + 1]))
            .collect();
        in_out_pairs.insert(0, (config.in_dim, config.units[0]));
        in_out_pairs.push((*config.units.last().unwrap(), config.out_dim));
        let vs = vs.pp("noisy_mlp");

        let layers = in_out_pairs
            .iter()
            .enumerate()
            .map(|(i, &(in_dim, out_dim))| {
                NoisyLinear::build(vs.pp(format!("ln{}", i)), in_dim, out_dim, config.sigma_init)
            })
            .collect();

        NoisyMlp { device, layers }
    }

    fn forward(&self, xs: &Self::Input) -> Tensor {
        self.forward_layers(xs, false)
    }

    fn forward_t(&self, xs: &Self::Input, train: bool) -> Tensor {
        self.forward_layers(xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn build_net() -> NoisyMlp {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        NoisyMlp::build(vb, NoisyMlpConfig::new(4, vec![8], 3))
    }

    #[test]
    fn eval_mode_is_deterministic() {
        let net = build_net();
        let x = Tensor::from_vec(vec![0.1f32, 0.2, 0.3, 0.4], (1, 4), &Device::Cpu).unwrap();
        let a = net.forward_t(&x, false).to_vec2::<f32>().unwrap();
        let b = net.forward_t(&x, false).to_vec2::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn train_mode_resamples_noise() {
        let net = build_net();
        let x = Tensor::from_vec(vec![0.1f32, 0.2, 0.3, 0.4], (1, 4), &Device::Cpu).unwrap();
        let a = net.forward_t(&x, true).to_vec2::<f32>().unwrap();
        let b = net.forward_t(&x, true).to_vec2::<f32>().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn output_width_matches_config() {
        let net = build_net();
        let x = Tensor::from_vec(vec![0.0f32; 4], (1, 4), &Device::Cpu).unwrap();
        assert_eq!(net.forward(&x).dims(), &[1, 3]);
    }
}
