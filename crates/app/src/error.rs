use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Engine(#[from] engine::EngineError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid document {path}: {reason}")]
    Document { path: String, reason: String },
}

impl AppError {
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, AppError::Engine(err) if err.is_integrity_violation())
    }
}
