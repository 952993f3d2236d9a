use thiserror::Error;

/// Settings that fail validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("{name} must be at least {min}, got {value}")]
    LimitTooLow {
        name: &'static str,
        value: u64,
        min: u64,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
