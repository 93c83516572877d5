pub mod conversion;
pub mod engine;
pub mod scoring;
pub mod training;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use conversion::{ConversionInput, ConversionPipeline};
pub use engine::Engine;
pub use scoring::{score_windows, ScoringPipeline};
pub use training::TrainingPipeline;
