//! Cached schema metadata and its invalidation.
//!
//! Consumers such as an ORM cache column information per logical table name.
//! That cache is stale as soon as the active namespace changes, because two
//! tenants may define the same table name differently. The router calls
//! [`SchemaDependent::reset_metadata`] on every dependent it is handed
//! whenever the search path changes.

use crate::error::SchemaResult;
use crate::provider::SchemaProvider;
use crate::sql;
use parking_lot::RwLock;
use schemata_log::debug;
use std::sync::Arc;

/// Something holding metadata derived from the active search path.
pub trait SchemaDependent: Send + Sync {
    /// Identifier used in logs (usually the logical table or model name).
    fn name(&self) -> &str;

    /// Drop cached metadata so it is reloaded under the current path.
    fn reset_metadata(&self);
}

/// Invoke the invalidation hook on every dependent.
pub fn reset_all(dependents: &[Arc<dyn SchemaDependent>]) {
    for dependent in dependents {
        debug!("resetting cached metadata for {}", dependent.name());
        dependent.reset_metadata();
    }
}

/// Column names of one unqualified table, resolved through the active path.
///
/// # Examples
///
/// ```rust,ignore
/// let items = Arc::new(ColumnCache::new("items"));
/// let columns = items.columns(&provider, &mut conn).await?;
///
/// router.switch_and_reset(&mut conn, &mut ctx, &path, &[items.clone()]).await?;
/// // reloaded from the new tenant's `items`
/// let columns = items.columns(&provider, &mut conn).await?;
/// ```
#[derive(Debug)]
pub struct ColumnCache {
    table: String,
    columns: RwLock<Option<Vec<String>>>,
}

impl ColumnCache {
    /// Create an empty cache for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: RwLock::new(None),
        }
    }

    /// Logical table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Cached columns without touching the database.
    pub fn cached(&self) -> Option<Vec<String>> {
        self.columns.read().clone()
    }

    /// Cached columns, loading them on first use.
    pub async fn columns<P: SchemaProvider + ?Sized>(
        &self,
        provider: &P,
        conn: &mut P::Connection,
    ) -> SchemaResult<Vec<String>> {
        let cached = self.cached();
        if let Some(columns) = cached {
            return Ok(columns);
        }

        let columns: Vec<String> = provider
            .query_text(conn, sql::TABLE_COLUMNS, &[self.table.as_str()])
            .await?
            .into_iter()
            .flatten()
            .collect();

        debug!("loaded {} columns for {}", columns.len(), self.table);
        *self.columns.write() = Some(columns.clone());
        Ok(columns)
    }
}

impl SchemaDependent for ColumnCache {
    fn name(&self) -> &str {
        &self.table
    }

    fn reset_metadata(&self) {
        *self.columns.write() = None;
    }
}
