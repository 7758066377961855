use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::IoError(_) => ErrorCategory::Io,
            AppError::ConfigError { .. }
            | AppError::ConfigValidationError { .. }
            | AppError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AppError::ServerError { .. } => ErrorCategory::Server,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Medium,
            ErrorCategory::Server => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::IoError(e) => format!("File system problem: {}", e),
            AppError::ConfigError { message } => format!("Configuration problem: {}", message),
            AppError::ConfigValidationError { field, message } => {
                format!("Configuration field '{}' is invalid: {}", field, message)
            }
            AppError::InvalidConfigValueError { field, value, reason } => {
                format!("'{}' is not a valid value for {}: {}", value, field, reason)
            }
            AppError::ServerError { message } => format!("Server could not start: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AppError::IoError(_) => "Check that the paths exist and are readable",
            AppError::ConfigError { .. } | AppError::ConfigValidationError { .. } => {
                "Check the TOML file syntax and field names"
            }
            AppError::InvalidConfigValueError { .. } => {
                "Fix the value on the command line or in the config file"
            }
            AppError::ServerError { .. } => "Make sure the address is free and the port is allowed",
        }
    }
}

/// Reasons a single decode strategy failed to turn the artifact into a model.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("could not read artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("safetensors: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),

    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("unsupported artifact layout: {message}")]
    Format { message: String },

    #[error("invalid model: {0}")]
    Model(#[from] ModelError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("X has {got} features, but {kind} is expecting {expected} features as input")]
    FeatureMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("malformed tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },

    #[error("{0}")]
    Structure(String),

    #[error("model returned no output")]
    EmptyOutput,

    #[error("model produced a non-finite value ({0})")]
    NonFinite(f64),
}

/// 預測路徑上的錯誤；輸入錯誤與推論錯誤共用同一個顯示格式
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Invalid input or prediction error: {0}")]
    InvalidInput(String),

    #[error("Model not found — place `{artifact}` in the project root.")]
    ModelUnavailable { artifact: String },

    #[error("Invalid input or prediction error: {0}")]
    Invocation(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, AppError>;
