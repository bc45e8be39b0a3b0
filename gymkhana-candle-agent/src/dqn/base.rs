//! DQN agent implemented with candle.
use super::{
    config::DqnConfig,
    explorer::{DecaySchedule, DqnExplorer},
    model::DqnModel,
};
use crate::{
    model::SubModel1,
    util::{smooth_l1_loss, track, CriticLoss, OutDim},
};
use anyhow::Result;
use candle_core::{shape::D, DType, Tensor};
use candle_nn::loss::mse;
use gymkhana_core::{
    record::{Record, RecordValue},
    Agent, Configurable, Env, ExperienceBufferBase, Policy, ReplayBufferBase, TransitionBatch,
};
use rand::{rngs::SmallRng, SeedableRng};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, marker::PhantomData, path::Path};

/// DQN agent.
///
/// Holds two value models of identical architecture: the online network,
/// trained on every optimization step, and the target network, a lagged
/// copy used to compute the learning targets. The target is synchronized
/// from the online parameters on an episode cadence through
/// [`Agent::on_episode_end`], never every step.
#[allow(clippy::upper_case_acronyms, dead_code)]
pub struct Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Output = Tensor>,
    R: ReplayBufferBase + ExperienceBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    pub(in crate::dqn) qnet: DqnModel<Q>,
    pub(in crate::dqn) qnet_tgt: DqnModel<Q>,
    pub(in crate::dqn) batch_size: usize,
    pub(in crate::dqn) min_transitions_warmup: usize,
    pub(in crate::dqn) n_updates_per_opt: usize,
    pub(in crate::dqn) discount_factor: f64,
    pub(in crate::dqn) tau: f64,
    pub(in crate::dqn) sync_interval: usize,
    pub(in crate::dqn) episodes: usize,
    pub(in crate::dqn) double_dqn: bool,
    pub(in crate::dqn) critic_loss: CriticLoss,
    pub(in crate::dqn) explorer: DqnExplorer,
    pub(in crate::dqn) train: bool,
    pub(in crate::dqn) device: candle_core::Device,
    pub(in crate::dqn) n_opts: usize,
    rng: SmallRng,
    phantom: PhantomData<(E, R)>,
}

impl<E, Q, R> Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Output = Tensor>,
    R: ReplayBufferBase + ExperienceBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    fn update_critic(&mut self, buffer: &mut R) -> f32 {
        let batch = buffer
            .batch(self.batch_size)
            .expect("The warmup fill was checked before sampling");
        let (obs, act, next_obs, reward, is_terminated, _is_truncated) = batch.unpack();
        let obs = obs.into();
        let act = act.into().to_device(&self.device).unwrap();
        let next_obs = next_obs.into();
        let reward =
            Tensor::from_slice(&reward[..], (reward.len(),), &self.device).unwrap();
        // Truncated episodes still bootstrap; only termination stops the
        // return.
        let is_not_terminated = {
            let v = is_terminated
                .iter()
                .map(|e| (1 - e) as f32)
                .collect::<Vec<_>>();
            Tensor::from_slice(&v[..], (v.len(),), &self.device).unwrap()
        };

        // Q of the taken actions under the online network.
        let pred = {
            let x = self.qnet.forward(&obs, true);
            x.gather(&act, D::Minus1)
                .unwrap()
                .squeeze(D::Minus1)
                .unwrap()
        };

        // reward if terminated, else reward + gamma * Q_tgt of the next
        // state; double DQN selects the next action with the online
        // network and evaluates it with the target network.
        let tgt = {
            let q = if self.double_dqn {
                let y = self
                    .qnet
                    .forward(&next_obs, true)
                    .argmax_keepdim(D::Minus1)
                    .unwrap();
                self.qnet_tgt
                    .forward(&next_obs, true)
                    .gather(&y, D::Minus1)
                    .unwrap()
            } else {
                let x = self.qnet_tgt.forward(&next_obs, true);
                let y = x.argmax_keepdim(D::Minus1).unwrap();
                x.gather(&y, D::Minus1).unwrap()
            };
            let q = q.squeeze(D::Minus1).unwrap();
            let q = (is_not_terminated * (q * self.discount_factor).unwrap()).unwrap();
            (reward + q).unwrap().detach()
        };

        let loss = match self.critic_loss {
            CriticLoss::Mse => mse(&pred, &tgt).unwrap(),
            CriticLoss::SmoothL1 => smooth_l1_loss(&pred, &tgt).unwrap(),
        };

        self.qnet.backward_step(&loss).unwrap();

        loss.to_scalar::<f32>().unwrap()
    }

    fn opt_(&mut self, buffer: &mut R) -> Record {
        let mut loss_critic = 0f32;

        for _ in 0..self.n_updates_per_opt {
            loss_critic += self.update_critic(buffer);
        }

        if let DqnExplorer::EpsilonGreedy(eg) = &mut self.explorer {
            if eg.schedule == DecaySchedule::PerOptStep {
                eg.decay();
            }
        }

        loss_critic /= self.n_updates_per_opt as f32;
        self.n_opts += 1;

        Record::from_slice(&[("loss_critic", RecordValue::Scalar(loss_critic))])
    }

    /// Synchronizes the target network from the online network.
    pub fn sync_target(&mut self) {
        track(self.qnet_tgt.get_varmap(), self.qnet.get_varmap(), self.tau)
            .expect("Failed to synchronize the target network");
    }

    /// The current exploration rate, if the explorer has one.
    pub fn eps(&self) -> Option<f64> {
        match &self.explorer {
            DqnExplorer::EpsilonGreedy(eg) => Some(eg.eps),
            DqnExplorer::Noisy => None,
        }
    }
}

impl<E, Q, R> Policy<E> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Output = Tensor>,
    R: ReplayBufferBase + ExperienceBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    /// In evaluation mode the exploration rate is forced to zero: the
    /// action is the argmax of the online network's values.
    fn sample(&mut self, obs: &E::Obs) -> E::Act {
        let a = self.qnet.forward(&obs.clone().into(), self.train);
        let a = if self.train {
            match &self.explorer {
                DqnExplorer::EpsilonGreedy(eg) => eg.action(&a, &mut self.rng),
                // Exploration noise was resampled in the forward pass.
                DqnExplorer::Noisy => a.argmax(D::Minus1).unwrap().to_dtype(DType::I64).unwrap(),
            }
        } else {
            a.argmax(D::Minus1).unwrap().to_dtype(DType::I64).unwrap()
        };
        a.into()
    }
}

impl<E, Q, R> Configurable for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Output = Tensor>,
    R: ReplayBufferBase + ExperienceBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    type Config = DqnConfig<Q::Config>;

    /// Constructs a DQN agent.
    fn build(config: Self::Config) -> Self {
        let device: candle_core::Device = config.device.unwrap_or(crate::Device::Cpu).into();
        let qnet = DqnModel::build(config.model_config.clone(), device.clone()).unwrap();
        let qnet_tgt = DqnModel::build(config.model_config, device.clone()).unwrap();

        let mut agent = Dqn {
            qnet,
            qnet_tgt,
            batch_size: config.batch_size,
            min_transitions_warmup: config.min_transitions_warmup,
            n_updates_per_opt: config.n_updates_per_opt,
            discount_factor: config.discount_factor,
            tau: config.tau,
            sync_interval: config.sync_interval,
            episodes: 0,
            double_dqn: config.double_dqn,
            critic_loss: config.critic_loss,
            explorer: config.explorer,
            train: true,
            device,
            n_opts: 0,
            rng: SmallRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        };
        // Both networks start from the same parameters.
        track(
            agent.qnet_tgt.get_varmap(),
            agent.qnet.get_varmap(),
            1.0,
        )
        .expect("Failed to initialize the target network");
        agent
    }
}

impl<E, Q, R> Agent<E, R> for Dqn<E, Q, R>
where
    E: Env,
    Q: SubModel1<Output = Tensor>,
    R: ReplayBufferBase + ExperienceBufferBase,
    E::Obs: Into<Q::Input>,
    E::Act: From<Q::Output>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
    R::Batch: TransitionBatch,
    <R::Batch as TransitionBatch>::ObsBatch: Into<Q::Input>,
    <R::Batch as TransitionBatch>::ActBatch: Into<Tensor>,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt(&mut self, buffer: &mut R) -> Option<Record> {
        if buffer.len() >= self.min_transitions_warmup {
            Some(self.opt_(buffer))
        } else {
            None
        }
    }

    fn on_episode_end(&mut self) -> Record {
        self.episodes += 1;

        if let DqnExplorer::EpsilonGreedy(eg) = &mut self.explorer {
            if eg.schedule == DecaySchedule::PerEpisode {
                eg.decay();
            }
        }

        if self.sync_interval > 0 && self.episodes % self.sync_interval == 0 {
            self.sync_target();
        }

        let mut record = Record::empty();
        if let Some(eps) = self.eps() {
            record.insert("eps", RecordValue::Scalar(eps as f32));
        }
        record
    }

    /// Saves the online network's parameters only; the target network is
    /// always re-derived by synchronization.
    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.qnet.save(path.join("qnet.safetensors"))?;
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.qnet.load(path.join("qnet.safetensors"))?;
        // Hard copy: after a load the target must equal the online
        // network, independent of the soft-update coefficient.
        track(self.qnet_tgt.get_varmap(), self.qnet.get_varmap(), 1.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dqn::{DqnModelConfig, EpsilonGreedy},
        mlp::{Mlp, MlpConfig},
        TensorBatch,
    };
    use candle_core::Device;
    use gymkhana_core::generic_replay_buffer::{
        GenericTransitionBatch, SimpleReplayBuffer, SimpleReplayBufferConfig,
    };
    use tempdir::TempDir;

    const DIM_OBS: usize = 4;
    const DIM_ACT: usize = 3;

    #[derive(Clone, Debug)]
    struct TestObs(Vec<f32>);

    impl gymkhana_core::Obs for TestObs {}

    impl From<TestObs> for Tensor {
        fn from(obs: TestObs) -> Tensor {
            let n = obs.0.len();
            Tensor::from_vec(obs.0, (1, n), &Device::Cpu).unwrap()
        }
    }

    #[derive(Clone, Debug)]
    struct TestAct(i64);

    impl gymkhana_core::Act for TestAct {}

    impl From<Tensor> for TestAct {
        fn from(t: Tensor) -> Self {
            Self(t.to_vec1::<i64>().unwrap()[0])
        }
    }

    struct TestEnv;

    impl Env for TestEnv {
        type Config = ();
        type Obs = TestObs;
        type Act = TestAct;
        type Info = ();

        fn build(_config: &(), _seed: i64) -> anyhow::Result<Self> {
            Ok(Self)
        }

        fn reset(&mut self) -> anyhow::Result<TestObs> {
            unimplemented!();
        }

        fn reset_with_index(&mut self, _ix: usize) -> anyhow::Result<TestObs> {
            unimplemented!();
        }

        fn step(&mut self, _a: &TestAct) -> (gymkhana_core::Step<Self>, Record) {
            unimplemented!();
        }

        fn step_with_reset(&mut self, _a: &TestAct) -> (gymkhana_core::Step<Self>, Record) {
            unimplemented!();
        }
    }

    type Buffer = SimpleReplayBuffer<TensorBatch, TensorBatch>;
    type TestDqn = Dqn<TestEnv, Mlp, Buffer>;

    fn agent_config() -> DqnConfig<MlpConfig> {
        let model_config = DqnModelConfig::default()
            .q_config(MlpConfig::new(DIM_OBS, vec![16], DIM_ACT))
            .out_dim(DIM_ACT);
        DqnConfig::default()
            .model_config(model_config)
            .batch_size(8)
            .min_transitions_warmup(8)
            .sync_interval(1)
            .explorer(DqnExplorer::EpsilonGreedy(EpsilonGreedy::new().eps(0.0)))
    }

    fn filled_buffer(n: usize) -> Buffer {
        let mut buffer = Buffer::build(
            &SimpleReplayBufferConfig::default()
                .capacity(100)
                .min_fill(1),
        );
        for i in 0..n {
            let v = i as f32 / n as f32;
            let obs = Tensor::from_vec(vec![v; DIM_OBS], (1, DIM_OBS), &Device::Cpu).unwrap();
            let next_obs =
                Tensor::from_vec(vec![v + 0.1; DIM_OBS], (1, DIM_OBS), &Device::Cpu).unwrap();
            let act =
                Tensor::from_vec(vec![(i % DIM_ACT) as i64], (1, 1), &Device::Cpu).unwrap();
            buffer
                .push(GenericTransitionBatch {
                    obs: TensorBatch::from_tensor(obs),
                    act: TensorBatch::from_tensor(act),
                    next_obs: TensorBatch::from_tensor(next_obs),
                    reward: vec![v],
                    is_terminated: vec![(i % 10 == 9) as i8],
                    is_truncated: vec![0],
                })
                .unwrap();
        }
        buffer
    }

    fn probe() -> Tensor {
        Tensor::from_vec(vec![0.1f32, -0.2, 0.3, -0.4], (1, DIM_OBS), &Device::Cpu).unwrap()
    }

    fn q_values(model: &DqnModel<Mlp>) -> Vec<Vec<f32>> {
        model.forward(&probe(), false).to_vec2::<f32>().unwrap()
    }

    #[test]
    fn target_equals_online_after_build() {
        let agent = TestDqn::build(agent_config());
        assert_eq!(q_values(&agent.qnet), q_values(&agent.qnet_tgt));
    }

    #[test]
    fn update_moves_online_and_sync_catches_up() {
        let mut agent = TestDqn::build(agent_config());
        let mut buffer = filled_buffer(16);

        let record = agent.opt(&mut buffer).unwrap();
        assert!(record.get_scalar("loss_critic").is_ok());

        // The online network moved, the target did not.
        assert_ne!(q_values(&agent.qnet), q_values(&agent.qnet_tgt));

        agent.sync_target();
        assert_eq!(q_values(&agent.qnet), q_values(&agent.qnet_tgt));
    }

    #[test]
    fn opt_is_skipped_below_warmup() {
        let mut agent = TestDqn::build(agent_config());
        let mut buffer = filled_buffer(4);
        assert!(agent.opt(&mut buffer).is_none());
    }

    #[test]
    fn episode_end_decays_epsilon() {
        let config = agent_config().explorer(DqnExplorer::EpsilonGreedy(
            EpsilonGreedy::new().eps(1.0).eps_decay(0.5).eps_min(0.1),
        ));
        let mut agent = TestDqn::build(config);
        let mut prev = agent.eps().unwrap();
        for _ in 0..10 {
            let record = agent.on_episode_end();
            let eps = agent.eps().unwrap();
            assert!(eps <= prev);
            assert!(eps >= 0.1);
            assert!(record.get_scalar("eps").is_ok());
            prev = eps;
        }
        assert_eq!(prev, 0.1);
    }

    #[test]
    fn eval_mode_is_greedy_and_deterministic() {
        let mut agent = TestDqn::build(agent_config());
        agent.eval();
        let obs = TestObs(vec![0.1, 0.2, 0.3, 0.4]);
        let first = agent.sample(&obs).0;
        for _ in 0..10 {
            assert_eq!(agent.sample(&obs).0, first);
        }
    }

    #[test]
    fn save_load_roundtrip() -> Result<()> {
        let dir = TempDir::new("dqn_params")?;
        let mut agent = TestDqn::build(agent_config());
        let mut buffer = filled_buffer(16);
        agent.opt(&mut buffer).unwrap();
        agent.save_params(dir.path())?;

        let mut other = TestDqn::build(agent_config());
        assert_ne!(q_values(&agent.qnet), q_values(&other.qnet));
        other.load_params(dir.path())?;
        assert_eq!(q_values(&agent.qnet), q_values(&other.qnet));
        // The target is re-derived from the loaded online network.
        assert_eq!(q_values(&other.qnet), q_values(&other.qnet_tgt));
        Ok(())
    }

    #[test]
    fn mismatched_shapes_fail_to_load() -> Result<()> {
        let dir = TempDir::new("dqn_params")?;
        let agent = TestDqn::build(agent_config());
        agent.save_params(dir.path())?;

        let model_config = DqnModelConfig::default()
            .q_config(MlpConfig::new(DIM_OBS + 2, vec![16], DIM_ACT))
            .out_dim(DIM_ACT);
        let mut other = TestDqn::build(agent_config().model_config(model_config));
        assert!(other.load_params(dir.path()).is_err());
        Ok(())
    }

    #[test]
    fn double_dqn_update_runs() {
        let mut agent = TestDqn::build(agent_config().double_dqn(true));
        let mut buffer = filled_buffer(16);
        assert!(agent.opt(&mut buffer).is_some());
    }
}
