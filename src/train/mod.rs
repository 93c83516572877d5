//! Fitting the autoencoder on feature windows.

pub mod trainer;

use serde::{Deserialize, Serialize};

pub use trainer::Trainer;

pub const DEFAULT_EPOCHS: usize = 50;
pub const DEFAULT_BATCH_SIZE: usize = 64;
pub const DEFAULT_LEARNING_RATE: f64 = 1e-3;
pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_THRESHOLD_PERCENTILE: f64 = 99.0;

/// Optimizer and schedule settings for [`Trainer::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Adam step size
    pub learning_rate: f64,
    /// Fraction of windows held out for `val_loss`
    pub validation_split: f64,
    /// Seeds the split, the per-epoch shuffle and weight init
    pub seed: u64,
    /// Reshuffle training windows every epoch
    pub shuffle: bool,
    /// Percentile of validation reconstruction error used as anomaly threshold
    pub threshold_percentile: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            learning_rate: DEFAULT_LEARNING_RATE,
            validation_split: DEFAULT_VALIDATION_SPLIT,
            seed: DEFAULT_SEED,
            shuffle: true,
            threshold_percentile: DEFAULT_THRESHOLD_PERCENTILE,
        }
    }
}
