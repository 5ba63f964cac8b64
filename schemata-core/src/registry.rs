//! Namespace Registry
//!
//! Creates, drops and enumerates PostgreSQL schemas.

use crate::error::{SchemaError, SchemaResult};
use crate::identifier::assert_safe;
use crate::provider::{SchemaProvider, query_one_text};
use crate::sql;
use schemata_log::{info, warn};
use std::sync::Arc;

/// Namespace lifecycle operations.
pub struct NamespaceRegistry<P: SchemaProvider> {
    provider: Arc<P>,
}

impl<P: SchemaProvider> NamespaceRegistry<P> {
    /// Create a registry over an injected provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// `CREATE SCHEMA <name>`.
    ///
    /// A namespace left behind by a partially failed create is not cleaned
    /// up; the error carries the session's search path for diagnosis.
    pub async fn create(&self, conn: &mut P::Connection, name: &str) -> SchemaResult<()> {
        assert_safe(name)?;
        info!("creating namespace {}", name);

        if let Err(cause) = self.provider.execute(conn, &sql::create_schema(name)).await {
            let search_path = self.diagnostic_path(conn).await;
            return Err(SchemaError::NamespaceCreateFailed {
                name: name.to_string(),
                search_path,
                cause,
            });
        }
        Ok(())
    }

    /// `DROP SCHEMA <name> CASCADE;`
    ///
    /// Irreversibly removes every table and row inside the namespace.
    pub async fn drop(&self, conn: &mut P::Connection, name: &str) -> SchemaResult<()> {
        assert_safe(name)?;
        warn!("dropping namespace {} and everything in it", name);

        if let Err(cause) = self.provider.execute(conn, &sql::drop_schema(name)).await {
            let search_path = self.diagnostic_path(conn).await;
            return Err(SchemaError::NamespaceDropFailed {
                name: name.to_string(),
                search_path,
                cause,
            });
        }
        Ok(())
    }

    /// Every namespace not reserved by the system (`pg_*`), sorted by name.
    pub async fn list(&self, conn: &mut P::Connection) -> SchemaResult<Vec<String>> {
        let names = self
            .provider
            .query_text(conn, sql::LIST_NAMESPACES, &[])
            .await?;
        Ok(names.into_iter().flatten().collect())
    }

    /// Whether a namespace called `name` exists. The name is bound, not interpolated.
    pub async fn exists(&self, conn: &mut P::Connection, name: &str) -> SchemaResult<bool> {
        let count = self
            .provider
            .query_count(conn, sql::NAMESPACE_EXISTS, &[name])
            .await?;
        Ok(count > 0)
    }

    async fn diagnostic_path(&self, conn: &mut P::Connection) -> String {
        match query_one_text(self.provider.as_ref(), conn, sql::CURRENT_SEARCH_PATH).await {
            Ok(Some(path)) => path,
            Ok(None) => "<null>".to_string(),
            Err(e) => format!("<unavailable: {e}>"),
        }
    }
}
