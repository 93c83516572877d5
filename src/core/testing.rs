//! In-memory storage and config shared by the pipeline tests.

use crate::core::{ConfigProvider, Storage};
use crate::data::{npy, Dataset};
use crate::model::AutoencoderConfig;
use crate::train::TrainingConfig;
use crate::utils::error::{AutoencoderError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, path: &str, data: Vec<u8>) {
        self.files.lock().await.insert(path.to_string(), data);
    }

    pub async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            AutoencoderError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

pub struct MockConfig {
    pub data_path: String,
    pub training: TrainingConfig,
    pub calibration_samples: usize,
}

impl MockConfig {
    pub fn new(data_path: &str) -> Self {
        Self {
            data_path: data_path.to_string(),
            training: TrainingConfig {
                epochs: 3,
                batch_size: 8,
                learning_rate: 5e-3,
                ..Default::default()
            },
            calibration_samples: 16,
        }
    }
}

impl ConfigProvider for MockConfig {
    fn data_path(&self) -> &str {
        &self.data_path
    }

    fn csv_has_headers(&self) -> bool {
        false
    }

    fn model_path(&self) -> &str {
        "models/autoencoder.zip"
    }

    fn artifact_path(&self) -> &str {
        "models/autoencoder.q8"
    }

    fn report_path(&self) -> &str {
        "reports/scores.csv"
    }

    fn calibration_samples(&self) -> usize {
        self.calibration_samples
    }

    fn training(&self) -> TrainingConfig {
        self.training.clone()
    }

    fn architecture(&self, input_dim: usize) -> AutoencoderConfig {
        AutoencoderConfig::new(input_dim)
            .with_hidden_dim(8)
            .with_bottleneck_dim(6)
            .with_latent_dim(3)
    }
}

/// Smooth synthetic windows: every row is a phase-shifted sine.
pub fn synthetic_windows(rows: usize, dim: usize) -> Dataset {
    let values = (0..rows)
        .flat_map(|r| (0..dim).map(move |c| ((r as f32) * 0.3 + (c as f32) * 0.7).sin() * 0.5))
        .collect();
    Dataset::new(rows, dim, values).unwrap()
}

pub fn synthetic_npy(rows: usize, dim: usize) -> Vec<u8> {
    npy::encode(&synthetic_windows(rows, dim)).unwrap()
}
