//! Mini-batch trainer
//!
//! Adam on mean squared reconstruction error, one optimizer step per batch.
//! Validation loss is computed once per epoch on the held-out windows.

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::{ElementConversion, TensorData};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use super::TrainingConfig;
use crate::data::Dataset;
use crate::domain::model::{EpochMetrics, TrainingSummary};
use crate::model::autoencoder::tensor_values;
use crate::model::{Autoencoder, AutoencoderConfig, InferenceBackend, ModelBundle, TrainingBackend};
use crate::utils::error::{AutoencoderError, Result};

const ADAM_BETA_1: f32 = 0.9;
const ADAM_BETA_2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-7;

#[derive(Debug, Clone)]
pub struct Trainer {
    architecture: AutoencoderConfig,
    config: TrainingConfig,
}

fn to_tensor<B: Backend>(data: &Dataset, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(
        TensorData::new(data.values().to_vec(), [data.rows(), data.dim()]),
        device,
    )
}

/// Per-window reconstruction MSE, evaluated in chunks of `batch_size` windows.
pub fn reconstruction_errors(
    model: &Autoencoder<InferenceBackend>,
    data: &Dataset,
    batch_size: usize,
) -> Result<Vec<f32>> {
    let device = Default::default();
    let indices: Vec<usize> = (0..data.rows()).collect();
    let mut errors = Vec::with_capacity(data.rows());

    for chunk in indices.chunks(batch_size.max(1)) {
        let batch = to_tensor::<InferenceBackend>(&data.select(chunk), &device);
        errors.extend(tensor_values(model.reconstruction_error(batch))?);
    }
    Ok(errors)
}

/// Nearest-rank percentile, `None` for an empty slice.
pub fn percentile(values: &[f32], pct: f64) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    Some(sorted[rank.clamp(1, sorted.len()) - 1])
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64) as f32
}

impl Trainer {
    pub fn new(architecture: AutoencoderConfig, config: TrainingConfig) -> Self {
        Self {
            architecture,
            config,
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn fit(&self, dataset: &Dataset) -> Result<ModelBundle> {
        if dataset.dim() != self.architecture.input_dim {
            return Err(AutoencoderError::shape(
                format!("{} features per window", self.architecture.input_dim),
                format!("{} features per window", dataset.dim()),
            ));
        }
        if self.config.epochs == 0 || self.config.batch_size == 0 {
            return Err(AutoencoderError::TrainingError {
                message: "epochs and batch_size must be at least 1".to_string(),
            });
        }

        let split = dataset.train_test_split(self.config.validation_split, self.config.seed)?;
        let train = &split.train;
        let validation = split.validation.as_ref();
        info!(
            "🧠 Training on {} windows, validating on {} (input_dim={})",
            train.rows(),
            validation.map(Dataset::rows).unwrap_or(0),
            dataset.dim()
        );

        TrainingBackend::seed(self.config.seed);
        let device: <TrainingBackend as Backend>::Device = Default::default();
        let mut model: Autoencoder<TrainingBackend> = self.architecture.init(&device);
        let mut optim = AdamConfig::new()
            .with_beta_1(ADAM_BETA_1)
            .with_beta_2(ADAM_BETA_2)
            .with_epsilon(ADAM_EPSILON)
            .init::<TrainingBackend, Autoencoder<TrainingBackend>>();
        let loss_fn = MseLoss::new();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..train.rows()).collect();
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 1..=self.config.epochs {
            if self.config.shuffle {
                order.shuffle(&mut rng);
            }

            let mut weighted_loss = 0.0f64;
            for chunk in order.chunks(self.config.batch_size) {
                let batch = to_tensor::<TrainingBackend>(&train.select(chunk), &device);
                let output = model.forward(batch.clone());
                let loss = loss_fn.forward(output, batch, Reduction::Mean);

                let loss_value: f32 = loss.clone().into_scalar().elem();
                if !loss_value.is_finite() {
                    return Err(AutoencoderError::TrainingError {
                        message: format!("loss diverged to {} at epoch {}", loss_value, epoch),
                    });
                }
                weighted_loss += loss_value as f64 * chunk.len() as f64;

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.config.learning_rate, model, grads);
            }

            let loss = (weighted_loss / train.rows() as f64) as f32;
            let val_loss = match validation {
                Some(v) => Some(mean(&reconstruction_errors(
                    &model.valid(),
                    v,
                    self.config.batch_size,
                )?)),
                None => None,
            };

            match val_loss {
                Some(val) => info!(
                    "Epoch {}/{} - loss: {:.6} - val_loss: {:.6}",
                    epoch, self.config.epochs, loss, val
                ),
                None => info!("Epoch {}/{} - loss: {:.6}", epoch, self.config.epochs, loss),
            }

            history.push(EpochMetrics {
                epoch,
                loss,
                val_loss,
            });
        }

        let model = model.valid();

        // 以驗證集 (若無則用訓練集) 的重建誤差分位數作為異常門檻
        let reference = validation.unwrap_or(train);
        let errors = reconstruction_errors(&model, reference, self.config.batch_size)?;
        let anomaly_threshold = percentile(&errors, self.config.threshold_percentile);
        debug!(
            "Anomaly threshold p{} = {:?} over {} windows",
            self.config.threshold_percentile,
            anomaly_threshold,
            errors.len()
        );

        let last = history.last().cloned();
        let summary = TrainingSummary {
            input_dim: dataset.dim(),
            train_rows: train.rows(),
            validation_rows: validation.map(Dataset::rows).unwrap_or(0),
            epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            learning_rate: self.config.learning_rate,
            seed: self.config.seed,
            final_loss: last.as_ref().map(|m| m.loss).unwrap_or_default(),
            final_val_loss: last.and_then(|m| m.val_loss),
            threshold_percentile: self.config.threshold_percentile,
            anomaly_threshold,
            trained_at: Utc::now(),
        };

        Ok(ModelBundle {
            config: self.architecture.clone(),
            summary,
            history,
            model,
        })
    }
}
