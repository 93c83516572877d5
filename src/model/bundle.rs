//! Trained model bundle.
//!
//! A zip archive holding `manifest.json` (architecture, training summary and
//! history) next to `weights.mpk`, the named MessagePack record of the burn module.

use std::io::{Cursor, Read, Write};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::autoencoder::{Autoencoder, AutoencoderConfig};
use super::InferenceBackend;
use crate::domain::model::{EpochMetrics, TrainingSummary};
use crate::utils::error::{AutoencoderError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const WEIGHTS_FILE: &str = "weights.mpk";
const BUNDLE_FORMAT: &str = "edge-autoencoder/1";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format: String,
    crate_version: String,
    config: AutoencoderConfig,
    summary: TrainingSummary,
    history: Vec<EpochMetrics>,
}

/// Trained autoencoder together with what it was trained on.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub config: AutoencoderConfig,
    pub summary: TrainingSummary,
    pub history: Vec<EpochMetrics>,
    pub model: Autoencoder<InferenceBackend>,
}

fn recorder_error(e: impl std::fmt::Display) -> AutoencoderError {
    AutoencoderError::RecorderError {
        message: e.to_string(),
    }
}

pub fn encode(bundle: &ModelBundle) -> Result<Vec<u8>> {
    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
        config: bundle.config.clone(),
        summary: bundle.summary.clone(),
        history: bundle.history.clone(),
    };
    let manifest_json = serde_json::to_vec_pretty(&manifest)?;

    let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
    let weights = Recorder::<InferenceBackend>::record(&recorder, bundle.model.clone().into_record(), ())
        .map_err(recorder_error)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(MANIFEST_FILE, SimpleFileOptions::default())?;
    zip.write_all(&manifest_json)?;

    zip.start_file(WEIGHTS_FILE, SimpleFileOptions::default())?;
    zip.write_all(&weights)?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|_| AutoencoderError::artifact(format!("model bundle is missing '{}'", name)))?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn decode(bytes: &[u8]) -> Result<ModelBundle> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_FILE)?)?;
    if manifest.format != BUNDLE_FORMAT {
        return Err(AutoencoderError::artifact(format!(
            "unsupported model bundle format '{}'",
            manifest.format
        )));
    }

    let weights = read_entry(&mut archive, WEIGHTS_FILE)?;
    let device = Default::default();
    let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::default();
    let record = Recorder::<InferenceBackend>::load(&recorder, weights, &device)
        .map_err(recorder_error)?;
    let model = manifest
        .config
        .init::<InferenceBackend>(&device)
        .load_record(record);

    tracing::debug!(
        "Decoded model bundle v{} (input_dim={})",
        manifest.crate_version,
        manifest.config.input_dim
    );

    Ok(ModelBundle {
        config: manifest.config,
        summary: manifest.summary,
        history: manifest.history,
        model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_bundle() -> ModelBundle {
        let config = AutoencoderConfig::new(6)
            .with_hidden_dim(8)
            .with_bottleneck_dim(4)
            .with_latent_dim(2);
        let model = config.init::<InferenceBackend>(&Default::default());
        ModelBundle {
            summary: TrainingSummary {
                input_dim: 6,
                train_rows: 10,
                validation_rows: 2,
                epochs: 1,
                batch_size: 4,
                learning_rate: 1e-3,
                seed: 42,
                final_loss: 0.5,
                final_val_loss: Some(0.6),
                threshold_percentile: 99.0,
                anomaly_threshold: Some(0.7),
                trained_at: Utc::now(),
            },
            history: vec![EpochMetrics {
                epoch: 1,
                loss: 0.5,
                val_loss: Some(0.6),
            }],
            config,
            model,
        }
    }

    #[test]
    fn test_bundle_preserves_weights_and_manifest() {
        let bundle = sample_bundle();
        let bytes = encode(&bundle).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.config.input_dim, 6);
        assert_eq!(decoded.config.latent_dim, 2);
        assert_eq!(decoded.summary.anomaly_threshold, Some(0.7));
        assert_eq!(decoded.history, bundle.history);
        assert_eq!(
            decoded.model.dense_layers().unwrap(),
            bundle.model.dense_layers().unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_non_zip() {
        assert!(decode(b"definitely not a zip").is_err());
    }

    #[test]
    fn test_decode_rejects_missing_weights() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(MANIFEST_FILE, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"{}").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(decode(&bytes).is_err());
    }
}
