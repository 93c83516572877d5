use anyhow::Result;
use edge_autoencoder::data::npy;
use edge_autoencoder::model::bundle;
use edge_autoencoder::quant::format;
use edge_autoencoder::{
    ConversionPipeline, Dataset, Engine, LocalStorage, ScoringPipeline, TomlConfig,
    TrainingPipeline,
};
use tempfile::TempDir;

/// 正常視窗為平滑正弦波，最後幾列為雜訊尖峰
fn windows(rows: usize, dim: usize, spikes: usize) -> Dataset {
    let mut values = Vec::with_capacity(rows * dim);
    for r in 0..rows {
        for c in 0..dim {
            let v = if r >= rows - spikes {
                if c % 2 == 0 { 4.0 } else { -4.0 }
            } else {
                ((r as f32) * 0.2 + (c as f32) * 0.5).sin() * 0.5
            };
            values.push(v);
        }
    }
    Dataset::new(rows, dim, values).unwrap()
}

fn config_for(dir: &TempDir, data_file: &str) -> Result<TomlConfig> {
    let root = dir.path().display();
    let toml = format!(
        r#"
[data]
path = "{root}/{data_file}"

[model]
path = "{root}/models/autoencoder.zip"
hidden_dim = 16
bottleneck_dim = 8
latent_dim = 4

[training]
epochs = 4
batch_size = 16
learning_rate = 0.005

[export]
path = "{root}/models/autoencoder.q8"
calibration_samples = 32

[scoring]
report_path = "{root}/reports/scores.csv"
"#
    );
    Ok(TomlConfig::from_toml_str(&toml)?)
}

#[tokio::test]
async fn test_train_convert_score_end_to_end() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::create_dir_all(dir.path().join("data"))?;
    std::fs::write(
        dir.path().join("data/windows_features.npy"),
        npy::encode(&windows(80, 10, 0))?,
    )?;
    std::fs::write(
        dir.path().join("data/to_score.npy"),
        npy::encode(&windows(20, 10, 2))?,
    )?;

    let storage = LocalStorage::new(dir.path().display().to_string());

    // Stage 1: train
    let config = config_for(&dir, "data/windows_features.npy")?;
    let model_path = Engine::new(TrainingPipeline::new(storage.clone(), config))
        .run()
        .await?;
    let trained = bundle::decode(&std::fs::read(&model_path)?)?;
    assert_eq!(trained.config.input_dim, 10);
    assert_eq!(trained.history.len(), 4);
    assert_eq!(trained.summary.train_rows, 64);
    assert_eq!(trained.summary.validation_rows, 16);
    let threshold = trained
        .summary
        .anomaly_threshold
        .expect("validation split yields a threshold");

    // Stage 2: convert
    let config = config_for(&dir, "data/windows_features.npy")?;
    let artifact_path = Engine::new(ConversionPipeline::new(storage.clone(), config))
        .run()
        .await?;
    let artifact = format::decode(&std::fs::read(&artifact_path)?)?;
    assert_eq!(artifact.input_dim(), 10);
    assert_eq!(artifact.layers().len(), 6);
    assert_eq!(artifact.anomaly_threshold(), Some(threshold));

    // Stage 3: score
    let config = config_for(&dir, "data/to_score.npy")?;
    let report_path = Engine::new(ScoringPipeline::new(storage, config))
        .run()
        .await?;

    let mut reader = csv::Reader::from_path(&report_path)?;
    let headers = reader.headers()?.clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["index", "reconstruction_error", "is_anomaly"]
    );
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    assert_eq!(rows.len(), 20);

    // 尖峰視窗超出校正範圍，重建誤差遠高於門檻
    for row in &rows[18..] {
        assert_eq!(&row[2], "true");
    }
    Ok(())
}

#[tokio::test]
async fn test_convert_without_trained_model_fails() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(
        dir.path().join("windows.npy"),
        npy::encode(&windows(10, 4, 0))?,
    )?;

    let storage = LocalStorage::new(dir.path().display().to_string());
    let config = config_for(&dir, "windows.npy")?;
    let err = Engine::new(ConversionPipeline::new(storage, config))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, edge_autoencoder::AutoencoderError::IoError(_)));
    Ok(())
}
