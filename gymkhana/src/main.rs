//! Train or evaluate a DQN driver in the obstacle field simulation.
use anyhow::Result;
use candle_core::Tensor;
use clap::Parser;
use gymkhana_candle_agent::{
    dqn::{Dqn, DqnConfig, DqnExplorer, DqnModelConfig, EpsilonGreedy},
    mlp::{Mlp, MlpConfig, NoisyMlp, NoisyMlpConfig},
    model::SubModel1,
    opt::OptimizerConfig,
    util::{CriticLoss, OutDim},
    TensorBatch,
};
use gymkhana_core::{
    generic_replay_buffer::{
        BatchBase, SimpleReplayBuffer, SimpleReplayBufferConfig, SimpleStepProcessor,
        SimpleStepProcessorConfig,
    },
    record::{CsvRecorder, NullRecorder, Recorder},
    Agent, Configurable, DefaultEvaluator, Env, Policy, ReplayBufferBase, StepProcessor, Trainer,
    TrainerConfig,
};
use gymkhana_sim::{
    render::{AsciiRenderer, Renderer},
    DriveAct, DriveEnv, DriveEnvConfig, DriveObs, Field, MazeFieldConfig, RectFieldConfig,
};
use log::info;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

const DIM_OBS: usize = 14;
const DIM_ACT: usize = DriveAct::N;
const LR_CRITIC: f64 = 0.001;
const DISCOUNT_FACTOR: f64 = 0.95;
const BATCH_SIZE: usize = 32;
const WARMUP_PERIOD: usize = 1000;
const N_UPDATES_PER_OPT: usize = 1;
const TAU: f64 = 1.0;
const SYNC_INTERVAL: usize = 1;
const OPT_INTERVAL: usize = 1;
const MAX_OPTS: usize = 100_000;
const EVAL_INTERVAL: usize = 5_000;
const FLUSH_INTERVAL: usize = 1_000;
const REPLAY_BUFFER_CAPACITY: usize = 2000;
const N_EPISODES_PER_EVAL: usize = 5;
const CRITIC_LOSS: CriticLoss = CriticLoss::Mse;
const MODEL_DIR: &str = "./model/dqn_drive";

mod obs_act_types {
    use super::*;

    pub struct ObsBatch(TensorBatch);

    impl BatchBase for ObsBatch {
        fn new(capacity: usize) -> Self {
            Self(TensorBatch::new(capacity))
        }

        fn push(&mut self, i: usize, data: Self) {
            self.0.push(i, data.0)
        }

        fn sample(&self, ixs: &[usize]) -> Self {
            Self(self.0.sample(ixs))
        }
    }

    impl From<DriveObs> for ObsBatch {
        fn from(obs: DriveObs) -> Self {
            let tensor: Tensor = obs.into();
            Self(TensorBatch::from_tensor(tensor))
        }
    }

    impl From<ObsBatch> for Tensor {
        fn from(b: ObsBatch) -> Self {
            b.0.into()
        }
    }

    pub struct ActBatch(TensorBatch);

    impl BatchBase for ActBatch {
        fn new(capacity: usize) -> Self {
            Self(TensorBatch::new(capacity))
        }

        fn push(&mut self, i: usize, data: Self) {
            self.0.push(i, data.0)
        }

        fn sample(&self, ixs: &[usize]) -> Self {
            Self(self.0.sample(ixs))
        }
    }

    impl From<DriveAct> for ActBatch {
        fn from(act: DriveAct) -> Self {
            let t = gymkhana_candle_agent::util::vec_to_tensor(vec![act.index()], true)
                .expect("Failed to convert DriveAct to ActBatch");
            Self(TensorBatch::from_tensor(t))
        }
    }

    // Required by Dqn.
    impl From<ActBatch> for Tensor {
        fn from(act: ActBatch) -> Self {
            act.0.into()
        }
    }

    pub type StepProc<F> = SimpleStepProcessor<DriveEnv<F>, ObsBatch, ActBatch>;
    pub type ReplayBuffer = SimpleReplayBuffer<ObsBatch, ActBatch>;
    pub type DriveDqn<F, Q> = Dqn<DriveEnv<F>, Q, ReplayBuffer>;
    pub type Evaluator<F, Q> = DefaultEvaluator<DriveEnv<F>, DriveDqn<F, Q>>;
}

use obs_act_types::*;

mod config {
    use super::*;

    pub fn rect_env_config() -> DriveEnvConfig<RectFieldConfig> {
        DriveEnvConfig::default().obs_dim(DIM_OBS)
    }

    pub fn maze_env_config() -> DriveEnvConfig<MazeFieldConfig> {
        DriveEnvConfig::default().obs_dim(DIM_OBS)
    }

    fn model_config<Q: OutDim + DeserializeOwned + Serialize>(q_config: Q) -> DqnModelConfig<Q> {
        let opt_config = OptimizerConfig::default().learning_rate(LR_CRITIC);
        DqnModelConfig::default()
            .q_config(q_config)
            .out_dim(DIM_ACT)
            .opt_config(opt_config)
    }

    fn agent_config<Q: OutDim + DeserializeOwned + Serialize>(
        model_config: DqnModelConfig<Q>,
        explorer: DqnExplorer,
    ) -> DqnConfig<Q> {
        DqnConfig::default()
            .model_config(model_config)
            .batch_size(BATCH_SIZE)
            .min_transitions_warmup(WARMUP_PERIOD)
            .n_updates_per_opt(N_UPDATES_PER_OPT)
            .discount_factor(DISCOUNT_FACTOR)
            .tau(TAU)
            .sync_interval(SYNC_INTERVAL)
            .critic_loss(CRITIC_LOSS)
            .explorer(explorer)
    }

    pub fn mlp_agent_config() -> DqnConfig<MlpConfig> {
        let q_config = MlpConfig::new(DIM_OBS, vec![64, 64], DIM_ACT);
        let explorer = DqnExplorer::EpsilonGreedy(EpsilonGreedy::new());
        agent_config(model_config(q_config), explorer)
    }

    pub fn noisy_agent_config() -> DqnConfig<NoisyMlpConfig> {
        let q_config = NoisyMlpConfig::new(DIM_OBS, vec![64, 64], DIM_ACT);
        agent_config(model_config(q_config), DqnExplorer::Noisy)
    }

    pub fn trainer_config(
        max_opts: usize,
        max_episodes: Option<usize>,
        eval_interval: usize,
        warmup_period: usize,
        model_dir: &str,
    ) -> TrainerConfig {
        TrainerConfig::default()
            .max_opts(max_opts)
            .max_episodes(max_episodes)
            .opt_interval(OPT_INTERVAL)
            .eval_interval(eval_interval)
            .flush_record_interval(FLUSH_INTERVAL)
            .save_interval(eval_interval)
            .warmup_period(warmup_period)
            .model_dir(model_dir)
    }
}

use config::*;

/// Train or evaluate a DQN driver in the obstacle field simulation
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Train the DQN agent, not evaluate
    #[arg(short, long, default_value_t = false)]
    train: bool,

    /// Evaluate a trained agent, not train
    #[arg(short, long, default_value_t = false)]
    eval: bool,

    /// Drive through a generated maze instead of the obstacle field
    #[arg(short, long, default_value_t = false)]
    maze: bool,

    /// Use the noisy-network exploration variant
    #[arg(short, long, default_value_t = false)]
    noisy: bool,

    /// Render evaluation episodes as ASCII frames
    #[arg(short, long, default_value_t = false)]
    render: bool,

    /// Stop training after this many episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Directory for model checkpoints
    #[arg(long, default_value = MODEL_DIR)]
    model_dir: String,
}

fn train<F, Q>(
    env_config: &DriveEnvConfig<F::Config>,
    agent_config: DqnConfig<Q::Config>,
    trainer_config: TrainerConfig,
    csv_path: Option<&Path>,
) -> Result<()>
where
    F: Field,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    let env = DriveEnv::<F>::build(env_config, 0)?;
    let step_proc = StepProc::<F>::build(&SimpleStepProcessorConfig::default());
    let buffer_config = SimpleReplayBufferConfig::default()
        .capacity(REPLAY_BUFFER_CAPACITY)
        .min_fill(BATCH_SIZE);
    let mut buffer = ReplayBuffer::build(&buffer_config);
    let mut agent: DriveDqn<F, Q> = Dqn::build(agent_config);
    let mut evaluator: Evaluator<F, Q> =
        DefaultEvaluator::new(DriveEnv::<F>::build(env_config, 1)?, N_EPISODES_PER_EVAL)?;
    let mut recorder: Box<dyn Recorder> = match csv_path {
        Some(path) => Box::new(CsvRecorder::new(path)?),
        None => Box::new(NullRecorder {}),
    };
    let mut trainer = Trainer::build(trainer_config);

    trainer.train(
        env,
        step_proc,
        &mut agent,
        &mut buffer,
        recorder.as_mut(),
        &mut evaluator,
    )?;

    Ok(())
}

fn eval<F, Q>(
    env_config: &DriveEnvConfig<F::Config>,
    agent_config: DqnConfig<Q::Config>,
    model_dir: &Path,
    render: bool,
) -> Result<()>
where
    F: Field,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    let mut env = DriveEnv::<F>::build(env_config, 0)?;
    let mut agent: DriveDqn<F, Q> = Dqn::build(agent_config);
    agent.load_params(model_dir)?;
    // Evaluation mode: exploration is forced to zero.
    agent.eval();

    let mut renderer = match render {
        true => Some(AsciiRenderer::stdout(96, 32)),
        false => None,
    };

    let mut obs = env.reset()?;
    let mut episode_return = 0f32;
    let mut steps = 0usize;
    loop {
        let act = agent.sample(&obs);
        let (step, _) = env.step(&act);
        episode_return += step.reward;
        steps += 1;
        // Rendering is a blocking call after the step and never touches
        // the simulation state.
        if let Some(renderer) = renderer.as_mut() {
            renderer.render(&env.frame());
        }
        if step.is_done() {
            break;
        }
        obs = step.obs;
    }
    info!(
        "Evaluation episode finished: return = {:.1} over {} steps",
        episode_return, steps
    );

    Ok(())
}

fn run_with<F, Q>(args: &Args, env_config: DriveEnvConfig<F::Config>, agent_config: DqnConfig<Q::Config>) -> Result<()>
where
    F: Field,
    Q: SubModel1<Input = Tensor, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + OutDim + Clone,
{
    let model_dir = Path::new(&args.model_dir);

    if args.train || !args.eval {
        std::fs::create_dir_all(model_dir)?;
        let trainer_config = trainer_config(
            MAX_OPTS,
            args.episodes,
            EVAL_INTERVAL,
            WARMUP_PERIOD,
            &args.model_dir,
        );
        train::<F, Q>(
            &env_config,
            agent_config.clone(),
            trainer_config,
            Some(&model_dir.join("train.csv")),
        )?;
    }

    if args.eval || !args.train {
        eval::<F, Q>(&env_config, agent_config, &model_dir.join("best"), args.render)?;
    }

    Ok(())
}

fn run<F>(args: &Args, env_config: DriveEnvConfig<F::Config>) -> Result<()>
where
    F: Field,
{
    match args.noisy {
        true => run_with::<F, NoisyMlp>(args, env_config, noisy_agent_config()),
        false => run_with::<F, Mlp>(args, env_config, mlp_agent_config()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.maze {
        true => run::<gymkhana_sim::MazeField>(&args, maze_env_config()),
        false => run::<gymkhana_sim::RectField>(&args, rect_env_config()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymkhana_sim::RectField;
    use tempdir::TempDir;

    #[test]
    fn train_then_eval_smoke() -> Result<()> {
        let tmp_dir = TempDir::new("dqn_drive")?;
        let model_dir = tmp_dir.path().to_str().unwrap().to_string();

        let env_config = rect_env_config().max_episode_steps(200);
        let agent_config = mlp_agent_config()
            .min_transitions_warmup(BATCH_SIZE)
            .batch_size(BATCH_SIZE);
        let trainer_config = trainer_config(100, None, 50, BATCH_SIZE, &model_dir);

        train::<RectField, Mlp>(
            &env_config,
            agent_config.clone(),
            trainer_config,
            Some(&tmp_dir.path().join("train.csv")),
        )?;

        let best = tmp_dir.path().join("best");
        eval::<RectField, Mlp>(&env_config, agent_config, &best, false)?;
        Ok(())
    }
}
