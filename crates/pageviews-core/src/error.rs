//! Shared error type across pageviews crates.

use thiserror::Error;

/// Stable error kinds, used as the `kind` field in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required setting was not supplied.
    ConfigurationMissing,
    /// Config present but unusable.
    InvalidConfig,
    /// Storage could not be reached.
    StorageUnavailable,
    /// Counter row missing or malformed.
    StorageIntegrity,
    /// Anything else (bind, serve).
    Internal,
}

impl ErrorKind {
    /// String representation used in structured logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConfigurationMissing => "CONFIGURATION_MISSING",
            ErrorKind::InvalidConfig => "INVALID_CONFIG",
            ErrorKind::StorageUnavailable => "STORAGE_UNAVAILABLE",
            ErrorKind::StorageIntegrity => "STORAGE_INTEGRITY",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, PageviewsError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum PageviewsError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("storage integrity: {0}")]
    StorageIntegrity(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl PageviewsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PageviewsError::ConfigurationMissing(_) => ErrorKind::ConfigurationMissing,
            PageviewsError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            PageviewsError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            PageviewsError::StorageIntegrity(_) => ErrorKind::StorageIntegrity,
            PageviewsError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        let err = PageviewsError::StorageIntegrity("no row".into());
        assert_eq!(err.kind().as_str(), "STORAGE_INTEGRITY");

        let err = PageviewsError::ConfigurationMissing("DB_CONNECTION_URI".into());
        assert_eq!(err.kind(), ErrorKind::ConfigurationMissing);
        assert_eq!(err.to_string(), "configuration missing: DB_CONNECTION_URI");
    }
}
