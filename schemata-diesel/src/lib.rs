//! # Schemata Diesel
//!
//! Runs schemata's namespace lifecycle and search-path routing on
//! `diesel-async`'s [`AsyncPgConnection`](diesel_async::AsyncPgConnection).
//!
//! ## Features
//!
//! - **Provider**: [`DieselSchemaProvider`] implements the core's `SchemaProvider`
//! - **Routed Checkouts**: [`TenantPool`] hands out connections bundled with a `RoutingContext`
//! - **Recycle Reset**: pooled connections return to the default search path
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use schemata_core::prelude::*;
//! use schemata_diesel::{DieselSchemaProvider, PgConfig, TenantPool};
//!
//! let pool = TenantPool::new(PgConfig::from_env()?, TenancyConfig::from_env()?).await?;
//! let provisioner = TenantProvisioner::builder(Arc::new(DieselSchemaProvider))
//!     .with_config(pool.tenancy().clone())
//!     .with_schema_loader(loader_fn::<AsyncPgConnection, _>(|conn| {
//!         Box::pin(async move {
//!             conn.batch_execute(include_str!("../schema.sql")).await?;
//!             Ok(())
//!         })
//!     }))
//!     .build()?;
//!
//! let mut checkout = pool.checkout().await?;
//! let (conn, ctx) = checkout.split();
//! provisioner.create_tenant(conn, ctx, "acme", &[], None).await?;
//! ```

#![warn(clippy::all)]

mod config;
mod error;
#[cfg(feature = "deadpool")]
mod pool;
mod provider;

pub use config::*;
pub use error::*;
#[cfg(feature = "deadpool")]
pub use pool::*;
pub use provider::*;

// Re-export diesel types for convenience
pub use diesel;
pub use diesel_async;
