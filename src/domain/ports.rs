use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Resolved locations and hyperparameters every pipeline reads from.
pub trait ConfigProvider: Send + Sync {
    fn data_path(&self) -> &str;
    fn csv_has_headers(&self) -> bool;
    fn model_path(&self) -> &str;
    fn artifact_path(&self) -> &str;
    fn report_path(&self) -> &str;
    fn calibration_samples(&self) -> usize;
    fn training(&self) -> crate::train::TrainingConfig;
    fn architecture(&self, input_dim: usize) -> crate::model::AutoencoderConfig;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Input: Send;
    type Output: Send;

    fn name(&self) -> &'static str;
    async fn extract(&self) -> Result<Self::Input>;
    async fn transform(&self, input: Self::Input) -> Result<Self::Output>;
    async fn load(&self, output: Self::Output) -> Result<String>;
}
