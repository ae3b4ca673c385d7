//! Error types for the content engine using thiserror
//!
//! All errors are typed and propagate with `?`.

use kasparro_core::KasparroError;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] KasparroError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing input: {0}")]
    MissingInput(String),
}

impl From<AppError> for KasparroError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Core(inner) => inner,
            AppError::Io(inner) => KasparroError::Io(inner),
            other => KasparroError::agent(other.to_string()),
        }
    }
}

/// Convenience Result type for the content engine
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_json_conversion_keeps_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AppError = json_err.into();
        assert!(matches!(err, AppError::Json(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AppError::Validation("price must be positive".to_string()).to_string(),
            "Validation failed: price must be positive"
        );
        assert_eq!(
            AppError::MissingInput("product_data".to_string()).to_string(),
            "Missing input: product_data"
        );
    }

    #[test]
    fn test_into_core_error() {
        let core: KasparroError = AppError::Parse("bad sheet".to_string()).into();
        assert!(matches!(core, KasparroError::Agent(_)));
        assert!(core.to_string().contains("bad sheet"));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let core: KasparroError = AppError::Io(io).into();
        assert!(matches!(core, KasparroError::Io(_)));
    }
}
