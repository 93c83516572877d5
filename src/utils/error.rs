use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoencoderError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Model record error: {message}")]
    RecorderError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data format error: {message}")]
    DataFormatError { message: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Training error: {message}")]
    TrainingError { message: String },

    #[error("Quantization error: {message}")]
    QuantizationError { message: String },

    #[error("Artifact error: {message}")]
    ArtifactError { message: String },

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Model,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 行程退出碼：輸入或配置錯誤 2，訓練或量化錯誤 1，系統錯誤 3
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl AutoencoderError {
    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormatError {
            message: message.into(),
        }
    }

    pub fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeError {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn artifact(message: impl Into<String>) -> Self {
        Self::ArtifactError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::DataFormatError { .. } | Self::ShapeError { .. } => {
                ErrorCategory::Data
            }
            Self::RecorderError { .. }
            | Self::TrainingError { .. }
            | Self::QuantizationError { .. }
            | Self::ArtifactError { .. }
            | Self::ZipError(_)
            | Self::SerializationError(_) => ErrorCategory::Model,
            Self::IoError(_) | Self::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::Medium,
            ErrorCategory::Model => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => "Check that the input file exists and the output directory is writable",
            Self::CsvError(_) => "Make sure every CSV row has the same number of numeric columns",
            Self::DataFormatError { .. } => {
                "Export the feature windows as a 2-D float array (.npy) or a numeric CSV"
            }
            Self::ShapeError { .. } => {
                "Use the same feature layout for training, conversion and scoring"
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the configuration file or CLI flags and retry",
            Self::TrainingError { .. } => {
                "Lower the learning rate or check the input data for extreme values"
            }
            Self::QuantizationError { .. } => {
                "Provide more representative samples for calibration"
            }
            Self::ArtifactError { .. } | Self::ZipError(_) | Self::RecorderError { .. } => {
                "Re-run the previous stage to regenerate the model file"
            }
            Self::SerializationError(_) => "The model manifest is corrupted; retrain the model",
            Self::TaskError(_) => "Retry; if the failure persists report it with logs",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Input data problem: {}", self),
            ErrorCategory::Model => format!("Model problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AutoencoderError>;
