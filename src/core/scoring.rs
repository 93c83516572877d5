use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::data::{load_dataset, Dataset};
use crate::domain::model::ScoreRecord;
use crate::quant::{format, QuantizedAutoencoder};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 以 int8 產物計算每個視窗的重建誤差並輸出 CSV 報告
pub struct ScoringPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ScoringPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

/// 對資料集逐列評分
pub fn score_windows(model: &QuantizedAutoencoder, dataset: &Dataset) -> Result<Vec<ScoreRecord>> {
    dataset
        .iter_rows()
        .enumerate()
        .map(|(index, window)| {
            let reconstruction_error = model.reconstruction_error(window)?;
            Ok(ScoreRecord {
                index,
                reconstruction_error,
                is_anomaly: model.is_anomaly(reconstruction_error),
            })
        })
        .collect()
}

#[async_trait]
impl<S, C> Pipeline for ScoringPipeline<S, C>
where
    S: Storage,
    C: ConfigProvider,
{
    type Input = (QuantizedAutoencoder, Dataset);
    type Output = Vec<ScoreRecord>;

    fn name(&self) -> &'static str {
        "score"
    }

    async fn extract(&self) -> Result<(QuantizedAutoencoder, Dataset)> {
        let artifact = self.storage.read_file(self.config.artifact_path()).await?;
        let model = format::decode(&artifact)?;

        let path = self.config.data_path();
        let bytes = self.storage.read_file(path).await?;
        let dataset = load_dataset(path, &bytes, self.config.csv_has_headers())?;
        Ok((model, dataset))
    }

    async fn transform(&self, input: (QuantizedAutoencoder, Dataset)) -> Result<Vec<ScoreRecord>> {
        let (model, dataset) = input;
        if model.anomaly_threshold().is_none() {
            tracing::warn!("⚠️ Artifact has no anomaly threshold, no window will be flagged");
        }

        let records =
            tokio::task::spawn_blocking(move || score_windows(&model, &dataset)).await??;

        let anomalies = records.iter().filter(|r| r.is_anomaly).count();
        tracing::info!("🔎 Scored {} windows, {} flagged as anomalous", records.len(), anomalies);
        Ok(records)
    }

    async fn load(&self, records: Vec<ScoreRecord>) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &records {
            writer.serialize(record)?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;

        let path = self.config.report_path();
        self.storage.write_file(path, &bytes).await?;
        Ok(path.to_string())
    }
}
