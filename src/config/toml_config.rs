use crate::core::ConfigProvider;
use crate::model::AutoencoderConfig;
use crate::model::autoencoder::{BOTTLENECK_DIM, HIDDEN_DIM, LATENT_DIM};
use crate::quant::DEFAULT_CALIBRATION_SAMPLES;
use crate::train::TrainingConfig;
use crate::utils::error::{AutoencoderError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_DATA_PATH: &str = "data/windows_features.npy";
pub const DEFAULT_MODEL_PATH: &str = "models/autoencoder.zip";
pub const DEFAULT_ARTIFACT_PATH: &str = "models/autoencoder.q8";
pub const DEFAULT_REPORT_PATH: &str = "reports/scores.csv";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub training: TrainingConfig,
    pub export: ExportConfig,
    pub scoring: ScoringConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub path: String,
    pub csv_has_headers: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DATA_PATH.to_string(),
            csv_has_headers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
    pub hidden_dim: usize,
    pub bottleneck_dim: usize,
    pub latent_dim: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_MODEL_PATH.to_string(),
            hidden_dim: HIDDEN_DIM,
            bottleneck_dim: BOTTLENECK_DIM,
            latent_dim: LATENT_DIM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: String,
    pub calibration_samples: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_ARTIFACT_PATH.to_string(),
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub report_path: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            report_path: DEFAULT_REPORT_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// "compact" or "json"
    pub log_format: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_format: "compact".to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AutoencoderError::MissingConfigError {
                field: format!("config file {}", path.display()),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AutoencoderError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AutoencoderError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("data.path", &self.data.path)?;
        validation::validate_file_extensions("data.path", &[self.data.path.as_str()], &["npy", "csv"])?;
        validation::validate_path("model.path", &self.model.path)?;
        validation::validate_path("export.path", &self.export.path)?;
        validation::validate_path("scoring.report_path", &self.scoring.report_path)?;

        validation::validate_positive_number("model.hidden_dim", self.model.hidden_dim, 1)?;
        validation::validate_positive_number("model.bottleneck_dim", self.model.bottleneck_dim, 1)?;
        validation::validate_positive_number("model.latent_dim", self.model.latent_dim, 1)?;

        validation::validate_positive_number("training.epochs", self.training.epochs, 1)?;
        validation::validate_positive_number("training.batch_size", self.training.batch_size, 1)?;
        validation::validate_positive_float("training.learning_rate", self.training.learning_rate)?;
        validation::validate_range(
            "training.validation_split",
            self.training.validation_split,
            0.0,
            0.9,
        )?;
        validation::validate_range(
            "training.threshold_percentile",
            self.training.threshold_percentile,
            0.0,
            100.0,
        )?;

        validation::validate_positive_number(
            "export.calibration_samples",
            self.export.calibration_samples,
            1,
        )?;

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.monitoring.log_format.as_str()) {
            return Err(AutoencoderError::InvalidConfigValueError {
                field: "monitoring.log_format".to_string(),
                value: self.monitoring.log_format.clone(),
                reason: format!("Valid formats: {}", valid_formats.join(", ")),
            });
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring.log_format == "json"
    }
}

impl ConfigProvider for TomlConfig {
    fn data_path(&self) -> &str {
        &self.data.path
    }

    fn csv_has_headers(&self) -> bool {
        self.data.csv_has_headers
    }

    fn model_path(&self) -> &str {
        &self.model.path
    }

    fn artifact_path(&self) -> &str {
        &self.export.path
    }

    fn report_path(&self) -> &str {
        &self.scoring.report_path
    }

    fn calibration_samples(&self) -> usize {
        self.export.calibration_samples
    }

    fn training(&self) -> TrainingConfig {
        self.training.clone()
    }

    fn architecture(&self, input_dim: usize) -> AutoencoderConfig {
        AutoencoderConfig::new(input_dim)
            .with_hidden_dim(self.model.hidden_dim)
            .with_bottleneck_dim(self.model.bottleneck_dim)
            .with_latent_dim(self.model.latent_dim)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
