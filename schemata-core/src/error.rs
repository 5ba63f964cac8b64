//! Error types for namespace lifecycle and search-path routing.

use thiserror::Error;

/// Boxed error returned by externally supplied loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by a [`SchemaProvider`](crate::SchemaProvider) round trip.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The connection could not be used.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The database rejected the statement.
    #[error("Query error: {0}")]
    Query(String),

    /// The result did not have the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// No connection could be checked out.
    #[error("Pool error: {0}")]
    Pool(String),
}

/// Errors surfaced by every public operation of this crate.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The name cannot be interpolated into DDL safely.
    #[error("Namespace name '{0}' is subject to identifier injection")]
    InjectionRisk(String),

    /// `CREATE SCHEMA` failed. No cleanup of a half-created namespace is attempted.
    #[error("Failed to create namespace '{name}' (search_path: {search_path}): {cause}")]
    NamespaceCreateFailed {
        /// Namespace being created
        name: String,
        /// Session search path when the failure happened
        search_path: String,
        /// Driver failure
        #[source]
        cause: DriverError,
    },

    /// `DROP SCHEMA ... CASCADE` failed.
    #[error("Failed to drop namespace '{name}' (search_path: {search_path}): {cause}")]
    NamespaceDropFailed {
        /// Namespace being dropped
        name: String,
        /// Session search path when the failure happened
        search_path: String,
        /// Driver failure
        #[source]
        cause: DriverError,
    },

    /// The search path could not be applied to the session.
    #[error("Invalid search path '{path}': {cause}")]
    InvalidPath {
        /// Rendered path that was rejected
        path: String,
        /// Why it was rejected
        #[source]
        cause: DriverError,
    },

    /// The path has no entries. Rejected before any round trip.
    #[error("Invalid search path: the path is empty")]
    EmptyPath,

    /// Strict path checking found an entry with no matching namespace.
    #[error("Invalid search path '{path}': namespace '{namespace}' does not exist")]
    UnknownNamespace {
        /// Rendered path that was rejected
        path: String,
        /// First missing namespace
        namespace: String,
    },

    /// `restore` was called with nothing recorded in the routing context.
    #[error("No prior search path recorded to restore")]
    NoPriorPath,

    /// The new tenant's namespace exists but the session could not be routed to it.
    #[error("Tenant '{tenant}' was created but could not be routed to: {cause}")]
    TenantRoutingFailed {
        /// Tenant namespace
        tenant: String,
        /// Routing failure
        #[source]
        cause: Box<SchemaError>,
    },

    /// After routing, the session reported a different search path.
    #[error("Search path ({actual}) does not equal tenant name ({expected})")]
    TenantVerificationFailed {
        /// Tenant namespace
        expected: String,
        /// Path the session reported
        actual: String,
    },

    /// Verification or loading failed after routing succeeded.
    /// The session has already been restored when this is returned.
    #[error("Tenant '{tenant}' could not be provisioned: {cause}")]
    TenantProvisioningFailed {
        /// Tenant namespace
        tenant: String,
        /// Verification or loader failure
        #[source]
        cause: Box<SchemaError>,
    },

    /// A schema, seed or callback loader failed.
    #[error("Loader error: {0}")]
    Load(#[source] BoxError),

    /// A read round trip failed outside of DDL or path changes.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SchemaError {
    /// Whether this error belongs to the invalid-path family.
    pub fn is_invalid_path(&self) -> bool {
        matches!(
            self,
            SchemaError::InvalidPath { .. }
                | SchemaError::EmptyPath
                | SchemaError::UnknownNamespace { .. }
                | SchemaError::NoPriorPath
        )
    }
}

/// Result type alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
