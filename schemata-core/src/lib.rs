//! Schema-per-tenant for PostgreSQL
//!
//! Each tenant lives in its own namespace ("schema") inside one database.
//! Queries reach the right tenant by changing the session's `search_path`
//! rather than by qualifying every table name.
//!
//! # Features
//!
//! - 🛡️ **Identifier Validation** - Namespace names are checked before they touch DDL
//! - 🗂️ **Namespace Registry** - Create, drop and list schemas
//! - 🧭 **Session Routing** - Switch and restore the search path, per connection
//! - 🔍 **Existence Checks** - Table lookups that honor the active search path
//! - 🏗️ **Tenant Provisioning** - Create, load and always route back
//!
//! # Quick Start
//!
//! ## 1. Implement the provider (or use `schemata-diesel`)
//!
//! ```rust,ignore
//! use schemata_core::*;
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl SchemaProvider for MyProvider {
//!     type Connection = MyConnection;
//!
//!     async fn execute(&self, conn: &mut MyConnection, sql: &str) -> Result<(), DriverError> {
//!         conn.batch_execute(sql).await.map_err(|e| DriverError::Query(e.to_string()))
//!     }
//!
//!     // ... query_text, query_count
//! }
//! ```
//!
//! ## 2. Provision a tenant
//!
//! ```rust,ignore
//! let provisioner = TenantProvisioner::builder(Arc::new(MyProvider))
//!     .with_schema_loader(loader_fn::<MyConnection, _>(|conn| {
//!         Box::pin(async move {
//!             conn.batch_execute("CREATE TABLE widgets (id BIGSERIAL PRIMARY KEY)").await?;
//!             Ok(())
//!         })
//!     }))
//!     .build()?;
//!
//! let mut ctx = provisioner.context();
//! provisioner.create_tenant(&mut conn, &mut ctx, "acme", &[], None).await?;
//!
//! // the session is back where it was; the table lives in `acme`
//! assert!(provisioner.exists(&mut conn, "acme.widgets").await?);
//! ```
//!
//! ## 3. Route a unit of work
//!
//! ```rust,ignore
//! let router = provisioner.router();
//! router.switch(&mut conn, &mut ctx, &SearchPath::single("acme")?).await?;
//! // unqualified queries resolve against `acme`
//! router.restore(&mut conn, &mut ctx).await?;
//! ```
//!
//! A [`RoutingContext`] holds the prior path and belongs to exactly one
//! connection checkout. Never share one between concurrent requests.

pub mod config;
pub mod context;
pub mod error;
pub mod identifier;
pub mod loader;
pub mod memory;
pub mod metadata;
pub mod oracle;
pub mod provider;
pub mod provisioner;
pub mod registry;
pub mod router;
pub mod search_path;
pub mod sql;

pub use config::{RouteHistory, TenancyConfig};
pub use context::RoutingContext;
pub use error::{BoxError, DriverError, SchemaError, SchemaResult};
pub use identifier::{USER_PLACEHOLDER, assert_safe, is_safe};
pub use loader::{FnLoader, LoadFuture, TenantLoader, loader_fn};
pub use memory::{InMemorySchemaProvider, MemorySession};
pub use metadata::{ColumnCache, SchemaDependent, reset_all};
pub use oracle::{ExistenceOracle, TableName};
pub use provider::SchemaProvider;
pub use provisioner::{ProvisionedTenant, SharedLoader, TenantProvisioner, TenantProvisionerBuilder};
pub use registry::NamespaceRegistry;
pub use router::SessionRouter;
pub use search_path::SearchPath;

pub use async_trait::async_trait;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{RouteHistory, TenancyConfig};
    pub use crate::context::RoutingContext;
    pub use crate::error::{DriverError, SchemaError, SchemaResult};
    pub use crate::loader::{TenantLoader, loader_fn};
    pub use crate::metadata::{ColumnCache, SchemaDependent};
    pub use crate::oracle::ExistenceOracle;
    pub use crate::provider::SchemaProvider;
    pub use crate::provisioner::{ProvisionedTenant, TenantProvisioner};
    pub use crate::registry::NamespaceRegistry;
    pub use crate::router::SessionRouter;
    pub use crate::search_path::SearchPath;
    pub use async_trait::async_trait;
}
