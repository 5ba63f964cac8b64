//! Existence Oracle
//!
//! Answers "does this table exist for the tenant the session is routed to".
//! Two tenants may both own a `widgets` table, so a bare name is only matched
//! against namespaces on the active search path.

use crate::error::SchemaResult;
use crate::provider::SchemaProvider;
use crate::sql;
use schemata_log::debug;
use std::fmt;
use std::sync::Arc;

/// A table reference as accepted by [`ExistenceOracle::exists`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Explicit namespace, if the reference was `namespace.table`.
    pub namespace: Option<String>,
    /// Table name with surrounding quotes removed.
    pub table: String,
}

impl TableName {
    /// Split `namespace.table`, `table` or `"quoted"`.
    ///
    /// A reference starting with a double quote is a literal table
    /// identifier and never carries a namespace, even if it contains a dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemata_core::TableName;
    ///
    /// let name = TableName::parse("acme.widgets");
    /// assert_eq!(name.namespace.as_deref(), Some("acme"));
    /// assert_eq!(name.table, "widgets");
    ///
    /// let quoted = TableName::parse("\"odd.name\"");
    /// assert_eq!(quoted.namespace, None);
    /// assert_eq!(quoted.table, "odd.name");
    /// ```
    pub fn parse(name: &str) -> Self {
        let (namespace, table) = if name.starts_with('"') {
            (None, name)
        } else {
            match name.split_once('.') {
                Some((namespace, table)) => (Some(namespace.to_string()), table),
                None => (None, name),
            }
        };

        let table = table.strip_prefix('"').unwrap_or(table);
        let table = table.strip_suffix('"').unwrap_or(table);

        Self {
            namespace,
            table: table.to_string(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}.{}", namespace, self.table),
            None => f.write_str(&self.table),
        }
    }
}

/// Search-path-aware table existence checks.
pub struct ExistenceOracle<P: SchemaProvider> {
    provider: Arc<P>,
}

impl<P: SchemaProvider> ExistenceOracle<P> {
    /// Create an oracle over an injected provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Whether `name` exists.
    ///
    /// `namespace.table` is looked up in that namespace regardless of the
    /// active path; a bare or quoted name only in namespaces on the path.
    pub async fn exists(&self, conn: &mut P::Connection, name: &str) -> SchemaResult<bool> {
        let name = TableName::parse(name);

        let count = match &name.namespace {
            Some(namespace) => {
                self.provider
                    .query_count(
                        conn,
                        sql::TABLE_EXISTS_IN_NAMESPACE,
                        &[name.table.as_str(), namespace.as_str()],
                    )
                    .await?
            }
            None => {
                self.provider
                    .query_count(conn, sql::TABLE_EXISTS_IN_PATH, &[name.table.as_str()])
                    .await?
            }
        };

        debug!("table {} matched {} time(s)", name, count);
        Ok(count > 0)
    }
}
