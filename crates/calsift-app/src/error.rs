use thiserror::Error;

/// Application-level errors (CLI layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    ServiceError(#[from] calsift_service::error::ServiceError),

    #[error(transparent)]
    ReportError(#[from] calsift_rfc::rfc::dav::parse::ReportParseError),

    #[error(transparent)]
    ParseError(#[from] calsift_rfc::rfc::ical::parse::ParseError),

    #[error(transparent)]
    CoreError(#[from] calsift_core::error::CoreError),

    #[error("I/O error on {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
