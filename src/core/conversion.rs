use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::data::{load_dataset, Dataset};
use crate::domain::model::ConversionReport;
use crate::model::{bundle, ModelBundle};
use crate::quant::{format, Converter, QuantizedAutoencoder};
use crate::utils::error::{AutoencoderError, Result};
use async_trait::async_trait;

/// 訓練好的模型包加上代表性資料集
#[derive(Debug)]
pub struct ConversionInput {
    pub bundle: ModelBundle,
    pub representative: Dataset,
}

/// 載入模型包，以代表性視窗校正後量化成 int8 產物
pub struct ConversionPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ConversionPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait]
impl<S, C> Pipeline for ConversionPipeline<S, C>
where
    S: Storage,
    C: ConfigProvider,
{
    type Input = ConversionInput;
    type Output = (QuantizedAutoencoder, ConversionReport);

    fn name(&self) -> &'static str {
        "convert"
    }

    async fn extract(&self) -> Result<ConversionInput> {
        let model_bytes = self.storage.read_file(self.config.model_path()).await?;
        let bundle = bundle::decode(&model_bytes)?;
        tracing::info!(
            "📦 Loaded model bundle (input_dim={}, trained {})",
            bundle.config.input_dim,
            bundle.summary.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        let data_path = self.config.data_path();
        let data_bytes = self.storage.read_file(data_path).await?;
        let dataset = load_dataset(data_path, &data_bytes, self.config.csv_has_headers())?;
        if dataset.dim() != bundle.config.input_dim {
            return Err(AutoencoderError::shape(
                format!("{} features per window", bundle.config.input_dim),
                format!("{} features per window", dataset.dim()),
            ));
        }

        let representative = dataset.head(self.config.calibration_samples());
        tracing::debug!(
            "Using {} of {} windows as representative data",
            representative.rows(),
            dataset.rows()
        );

        Ok(ConversionInput {
            bundle,
            representative,
        })
    }

    async fn transform(
        &self,
        input: ConversionInput,
    ) -> Result<(QuantizedAutoencoder, ConversionReport)> {
        let converter = Converter::new(self.config.calibration_samples());
        tokio::task::spawn_blocking(move || converter.convert(&input.bundle, &input.representative))
            .await?
    }

    async fn load(&self, output: (QuantizedAutoencoder, ConversionReport)) -> Result<String> {
        let (model, report) = output;
        let bytes = format::encode(&model)?;
        let path = self.config.artifact_path();
        self.storage.write_file(path, &bytes).await?;
        tracing::info!(
            "📁 Int8 artifact: {} bytes ({} calibration windows)",
            report.artifact_bytes,
            report.calibration_samples
        );
        Ok(path.to_string())
    }
}
