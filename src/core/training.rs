use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::data::{load_dataset, Dataset};
use crate::model::{bundle, ModelBundle};
use crate::train::Trainer;
use crate::utils::error::Result;
use async_trait::async_trait;

/// 讀取特徵視窗、訓練自編碼器並寫出模型包
pub struct TrainingPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> TrainingPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait]
impl<S, C> Pipeline for TrainingPipeline<S, C>
where
    S: Storage,
    C: ConfigProvider,
{
    type Input = Dataset;
    type Output = ModelBundle;

    fn name(&self) -> &'static str {
        "train"
    }

    async fn extract(&self) -> Result<Dataset> {
        let path = self.config.data_path();
        tracing::debug!("Reading feature windows from {}", path);
        let bytes = self.storage.read_file(path).await?;
        let dataset = load_dataset(path, &bytes, self.config.csv_has_headers())?;
        tracing::info!(
            "📊 Loaded {} windows with {} features",
            dataset.rows(),
            dataset.dim()
        );
        Ok(dataset)
    }

    async fn transform(&self, dataset: Dataset) -> Result<ModelBundle> {
        let trainer = Trainer::new(
            self.config.architecture(dataset.dim()),
            self.config.training(),
        );
        tracing::debug!("Training config: {:?}", trainer.config());

        // 訓練為 CPU 密集工作，不佔用 async worker
        let bundle = tokio::task::spawn_blocking(move || trainer.fit(&dataset)).await??;

        let summary = &bundle.summary;
        tracing::info!(
            "📉 Final loss {:.6}{}",
            summary.final_loss,
            summary
                .final_val_loss
                .map(|v| format!(", val_loss {:.6}", v))
                .unwrap_or_default()
        );
        if let Some(threshold) = summary.anomaly_threshold {
            tracing::info!(
                "🚨 Anomaly threshold (p{}) = {:.6}",
                summary.threshold_percentile,
                threshold
            );
        }
        Ok(bundle)
    }

    async fn load(&self, bundle: ModelBundle) -> Result<String> {
        let bytes = bundle::encode(&bundle)?;
        let path = self.config.model_path();
        tracing::debug!("Writing model bundle ({} bytes)", bytes.len());
        self.storage.write_file(path, &bytes).await?;
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{synthetic_npy, MockConfig, MockStorage};
    use crate::core::Engine;
    use crate::utils::error::AutoencoderError;

    #[tokio::test]
    async fn test_training_pipeline_writes_bundle() {
        let storage = MockStorage::new();
        storage.put("data/windows.npy", synthetic_npy(40, 6)).await;

        let pipeline = TrainingPipeline::new(storage.clone(), MockConfig::new("data/windows.npy"));
        let path = Engine::new(pipeline).run().await.unwrap();
        assert_eq!(path, "models/autoencoder.zip");

        let bytes = storage.get_file("models/autoencoder.zip").await.unwrap();
        let bundle = bundle::decode(&bytes).unwrap();
        assert_eq!(bundle.config.input_dim, 6);
        assert_eq!(bundle.history.len(), 3);
        assert_eq!(bundle.summary.train_rows, 32);
        assert_eq!(bundle.summary.validation_rows, 8);
        assert!(bundle.summary.anomaly_threshold.is_some());
    }

    #[tokio::test]
    async fn test_missing_data_file() {
        let pipeline = TrainingPipeline::new(MockStorage::new(), MockConfig::new("data/none.npy"));
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, AutoencoderError::IoError(_)));
    }

    #[tokio::test]
    async fn test_csv_windows_are_accepted() {
        let storage = MockStorage::new();
        storage
            .put("w.csv", b"0.1,0.2,0.3\n0.4,0.5,0.6\n".to_vec())
            .await;
        let pipeline = TrainingPipeline::new(storage, MockConfig::new("w.csv"));
        let dataset = pipeline.extract().await.unwrap();
        assert_eq!((dataset.rows(), dataset.dim()), (2, 3));
    }
}
