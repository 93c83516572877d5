use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub val_loss: Option<f32>,
}

/// 訓練結果摘要，寫入模型包的 manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub input_dim: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
    pub final_loss: f32,
    pub final_val_loss: Option<f32>,
    pub threshold_percentile: f64,
    pub anomaly_threshold: Option<f32>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub calibration_samples: usize,
    pub layers: usize,
    pub max_abs_diff: f32,
    pub mean_abs_diff: f32,
    pub artifact_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub index: usize,
    pub reconstruction_error: f32,
    pub is_anomaly: bool,
}
