//! Feature-window datasets: loading, splitting and batching helpers.

pub mod csv_source;
pub mod npy;

use crate::utils::error::{AutoencoderError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

/// Row-major `rows x dim` matrix of feature windows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    rows: usize,
    dim: usize,
    values: Vec<f32>,
}

/// Result of [`Dataset::train_test_split`].
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub validation: Option<Dataset>,
}

impl Dataset {
    pub fn new(rows: usize, dim: usize, values: Vec<f32>) -> Result<Self> {
        if rows == 0 || dim == 0 {
            return Err(AutoencoderError::shape(
                "at least one window with at least one feature",
                format!("[{}, {}]", rows, dim),
            ));
        }
        if values.len() != rows * dim {
            return Err(AutoencoderError::shape(
                format!("{} values for [{}, {}]", rows * dim, rows, dim),
                format!("{} values", values.len()),
            ));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(AutoencoderError::data_format(format!(
                "non-finite value at window {}, feature {}",
                pos / dim,
                pos % dim
            )));
        }

        Ok(Self { rows, dim, values })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dim;
        &self.values[start..start + self.dim]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks_exact(self.dim)
    }

    /// First `n` windows, used as the representative set for calibration.
    pub fn head(&self, n: usize) -> Dataset {
        let rows = n.clamp(1, self.rows);
        Dataset {
            rows,
            dim: self.dim,
            values: self.values[..rows * self.dim].to_vec(),
        }
    }

    /// Gather the given rows into a new dataset. `indices` must be non-empty and in range.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        let mut values = Vec::with_capacity(indices.len() * self.dim);
        for &i in indices {
            values.extend_from_slice(self.row(i));
        }
        Dataset {
            rows: indices.len(),
            dim: self.dim,
            values,
        }
    }

    /// Shuffle with a seeded RNG and hold out `ceil(validation_split * rows)` windows.
    pub fn train_test_split(&self, validation_split: f64, seed: u64) -> Result<Split> {
        if !(0.0..1.0).contains(&validation_split) {
            return Err(AutoencoderError::InvalidConfigValueError {
                field: "training.validation_split".to_string(),
                value: validation_split.to_string(),
                reason: "Value must be in [0, 1)".to_string(),
            });
        }

        let n_val = (validation_split * self.rows as f64).ceil() as usize;
        if n_val >= self.rows {
            return Err(AutoencoderError::shape(
                "at least one training window after the validation split",
                format!("{} windows with {} held out", self.rows, n_val),
            ));
        }

        let mut indices: Vec<usize> = (0..self.rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (val_idx, train_idx) = indices.split_at(n_val);
        let validation = if val_idx.is_empty() {
            None
        } else {
            Some(self.select(val_idx))
        };

        Ok(Split {
            train: self.select(train_idx),
            validation,
        })
    }
}

/// 依副檔名選擇解析器 (.npy 或 .csv)
pub fn load_dataset(path: &str, bytes: &[u8], csv_has_headers: bool) -> Result<Dataset> {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let dataset = match extension.as_deref() {
        Some("npy") => npy::decode(bytes)?,
        Some("csv") => csv_source::decode(bytes, csv_has_headers)?,
        _ => {
            return Err(AutoencoderError::InvalidConfigValueError {
                field: "data.path".to_string(),
                value: path.to_string(),
                reason: "Feature windows must be a .npy or .csv file".to_string(),
            })
        }
    };

    tracing::debug!(
        "Loaded {} windows x {} features from {}",
        dataset.rows(),
        dataset.dim(),
        path
    );
    Ok(dataset)
}
