//! Error types for the Diesel binding.

use schemata_core::{DriverError, SchemaError};
use thiserror::Error;

/// Errors raised while setting up or using the connection pool.
#[derive(Error, Debug)]
pub enum DieselError {
    /// Connection pool error.
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query execution error.
    #[error("Query error: {0}")]
    Query(#[from] diesel::result::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Routing or provisioning error from the core.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Result type alias for Diesel operations.
pub type DieselResult<T> = Result<T, DieselError>;

/// Classify a Diesel failure for the core.
pub(crate) fn driver_error(err: diesel::result::Error) -> DriverError {
    use diesel::result::Error;

    match err {
        Error::DeserializationError(e) => DriverError::Decode(e.to_string()),
        Error::NotFound => DriverError::Decode("no row returned".to_string()),
        Error::BrokenTransactionManager => DriverError::Connection(err.to_string()),
        other => DriverError::Query(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_mapping() {
        assert!(matches!(
            driver_error(diesel::result::Error::BrokenTransactionManager),
            DriverError::Connection(_)
        ));
        assert!(matches!(
            driver_error(diesel::result::Error::NotFound),
            DriverError::Decode(_)
        ));
        assert!(matches!(
            driver_error(diesel::result::Error::RollbackTransaction),
            DriverError::Query(_)
        ));
    }
}
