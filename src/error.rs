//! Error types for tijo

use thiserror::Error;

/// Main error type for tijo operations
#[derive(Debug, Error)]
pub enum TijoError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("No template found for '{0}'")]
    TemplateNotFound(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token expired")]
    TokenExpired,

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error {status}: {url}")]
    HttpError { status: u16, url: String },
}

/// Result type alias for tijo operations
pub type TijoResult<T> = Result<T, TijoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_survives_anyhow() {
        let err: anyhow::Error = TijoError::TemplateNotFound("ls -la".to_string()).into();
        assert_eq!(err.to_string(), "No template found for 'ls -la'");
        assert!(matches!(
            err.downcast_ref::<TijoError>(),
            Some(TijoError::TemplateNotFound(invocation)) if invocation == "ls -la"
        ));
    }
}
