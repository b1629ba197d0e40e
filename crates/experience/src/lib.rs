//! Experience collection for training pacing agents.
//!
//! This crate drives a [`pacing::simulation::Simulation`] through full episodes
//! using an externally trained action-value estimator, records every step as a
//! transition, and samples training batches that always include the episode's
//! terminal transition.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use experience::prelude::*;
//!
//! let config = ExperienceConfig::default();
//! let mut collector = ExperienceCollector::new(&config)?;
//! let estimator = LinearEstimator::favoring(0);
//! let mut rng = rand::thread_rng();
//!
//! while !collector.is_done() {
//!     let collected = collector.next_rollout(&estimator, &mut rng)?;
//!     if let Some(batch) = collected.batch {
//!         let targets = batch.q_targets(&estimator, config.training.discount);
//!         // ...train the estimator on `batch` and `targets`
//!     }
//! }
//! ```

pub mod collector;
pub mod config;
pub mod errors;
pub mod estimator;
pub mod exploration;
pub mod replay;
pub mod rollout;
pub mod trajectory;
pub mod workers;

pub use errors::ExperienceError;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::collector::{CollectedRollout, ExperienceCollector};
    pub use crate::config::{ExperienceConfig, RiderConfig, SimulationConfig, TrainingConfig};
    pub use crate::errors::ExperienceError;
    pub use crate::estimator::LinearEstimator;
    pub use crate::exploration::{
        ACTION_INDEX_OFFSET, ActionValueEstimator, ActionValues, EpsilonGreedy, EpsilonSchedule,
        MAX_ACTION, NUM_ACTIONS,
    };
    pub use crate::replay::{Batch, ExperienceReplay, Transition};
    pub use crate::rollout::{Rollout, RolloutOutcome, RolloutStats, RolloutSummary};
    pub use crate::trajectory::{Trajectory, TrajectoryPoint};
    pub use crate::workers::{WorkerRollout, run_independent_rollouts};
    pub use pacing::prelude::*;
}
