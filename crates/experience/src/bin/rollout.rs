//! Collects experience with the configured schedule and reports rollout statistics.
//!
//! Run with:
//! ```text
//! PACING_CONFIG=config.json ESTIMATOR_WEIGHTS=weights.json cargo run -p experience --bin rollout
//! ```
//!
//! Without `PACING_CONFIG` the default quadratic-hill setup is used. Without
//! `ESTIMATOR_WEIGHTS` the estimator always holds the current force. Set
//! `TRAJECTORY_OUT` to write the last rollout's trajectory as JSON. Set
//! `ESTIMATOR_INDEX_OFFSET=11` for weights whose rows are `action + 11`.

use std::env;

use experience::prelude::*;
use experience::workers::summarize;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match env::var("PACING_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            ExperienceConfig::from_json_file(&path)?
        }
        Err(_) => ExperienceConfig::default(),
    };

    let estimator = match env::var("ESTIMATOR_WEIGHTS") {
        Ok(path) => {
            tracing::info!("Loading estimator weights from {}", path);
            let estimator = LinearEstimator::from_json_file(&path)?;
            match env::var("ESTIMATOR_INDEX_OFFSET") {
                Ok(offset) => estimator.with_index_offset(offset.parse()?),
                Err(_) => estimator,
            }
        }
        Err(_) => {
            tracing::warn!("ESTIMATOR_WEIGHTS not set, using a hold-force estimator");
            LinearEstimator::favoring(0)
        }
    };

    let seed = config.training.seed.unwrap_or_else(rand::random);
    let mut rng = StdRng::seed_from_u64(seed);
    tracing::info!("Seed: {}", seed);

    let mut collector = ExperienceCollector::new(&config)?;
    let report_every = (config.training.rollouts / 20).max(1);

    while !collector.is_done() {
        let collected = collector.next_rollout(&estimator, &mut rng)?;
        if collected.index % report_every == 0 {
            let mean_target = collected
                .batch
                .as_ref()
                .map(|batch| {
                    let targets = batch.q_targets(&estimator, config.training.discount);
                    targets.iter().sum::<f64>() / targets.len() as f64
                })
                .unwrap_or(0.0);
            tracing::info!(
                rollout = collected.index,
                epsilon = collected.summary.epsilon,
                outcome = ?collected.summary.outcome,
                steps = collected.summary.steps,
                total_reward = collected.summary.total_reward,
                mean_target,
                "Rollout"
            );
        }
    }

    let mut stats = collector.stats().clone();

    if config.training.workers > 1 {
        let epsilon = config.training.epsilon.epsilon_at(config.training.rollouts);
        let parallel = run_independent_rollouts(
            &config,
            &estimator,
            epsilon,
            config.training.workers,
            seed,
        )?;
        let parallel_stats = summarize(&parallel);
        tracing::info!(
            workers = config.training.workers,
            finished = parallel_stats.finished,
            aborted = parallel_stats.aborted,
            "Parallel rollouts completed"
        );
        stats.merge(&parallel_stats);
    }

    tracing::info!("Collection completed!");
    tracing::info!("  Rollouts: {}", stats.rollouts);
    tracing::info!("  Finished: {}", stats.finished);
    tracing::info!("  Aborted: {}", stats.aborted);
    tracing::info!("  Truncated: {}", stats.truncated);
    if stats.non_finite > 0 {
        tracing::warn!("  Non-finite: {}", stats.non_finite);
    }
    tracing::info!("  Steps: {}", stats.total_steps);
    for (mistake, count) in &stats.violations {
        tracing::info!("  {}: {}", mistake, count);
    }
    if let Some(best) = stats.best_finish_time {
        tracing::info!("  Best finish time: {:.1}s", best);
    }

    if let Ok(path) = env::var("TRAJECTORY_OUT") {
        let trajectory =
            Trajectory::from_replay(collector.replay(), &collector.simulation().denormalizer());
        trajectory.write_json(&path)?;
        tracing::info!("Wrote {} trajectory points to {}", trajectory.len(), path);
    }

    Ok(())
}
