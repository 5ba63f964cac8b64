//! In-memory PostgreSQL stand-in.
//!
//! Models just enough of a database for the namespace lifecycle: a shared
//! catalog of namespaces and tables, and per-session search paths. Sessions
//! opened from the same provider see the same catalog, like connections to
//! one physical database.

use crate::error::DriverError;
use crate::identifier::USER_PLACEHOLDER;
use crate::provider::SchemaProvider;
use crate::search_path::{SearchPath, resolve_entry};
use crate::sql;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const SYSTEM_NAMESPACES: [&str; 4] = ["information_schema", "pg_catalog", "pg_toast", "public"];

#[derive(Debug)]
struct Catalog {
    namespaces: BTreeSet<String>,
    // (namespace, table) -> column names
    tables: BTreeMap<(String, String), Vec<String>>,
}

impl Catalog {
    fn new() -> Self {
        Self {
            namespaces: SYSTEM_NAMESPACES.iter().map(|s| s.to_string()).collect(),
            tables: BTreeMap::new(),
        }
    }
}

/// In-memory [`SchemaProvider`] for tests.
#[derive(Debug, Clone)]
pub struct InMemorySchemaProvider {
    catalog: Arc<RwLock<Catalog>>,
}

impl InMemorySchemaProvider {
    /// Create a database holding only the system namespaces and `public`.
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(RwLock::new(Catalog::new())),
        }
    }

    /// Open a session as user `app` with the default `"$user", public` path.
    pub fn session(&self) -> MemorySession {
        self.session_as("app")
    }

    /// Open a session as `user`.
    pub fn session_as(&self, user: impl Into<String>) -> MemorySession {
        MemorySession {
            catalog: Arc::clone(&self.catalog),
            user: user.into(),
            search_path: SearchPath::postgres_default().entries().to_vec(),
            failures: Vec::new(),
            ignored: Vec::new(),
            statements: Vec::new(),
        }
    }

    /// Every namespace, including system ones.
    pub fn namespaces(&self) -> Vec<String> {
        self.catalog.read().namespaces.iter().cloned().collect()
    }

    /// Whether `namespace.table` exists.
    pub fn has_table(&self, namespace: &str, table: &str) -> bool {
        self.catalog
            .read()
            .tables
            .contains_key(&(namespace.to_string(), table.to_string()))
    }
}

impl Default for InMemorySchemaProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// One session against an [`InMemorySchemaProvider`].
#[derive(Debug)]
pub struct MemorySession {
    catalog: Arc<RwLock<Catalog>>,
    user: String,
    search_path: Vec<String>,
    failures: Vec<String>,
    ignored: Vec<String>,
    statements: Vec<String>,
}

impl MemorySession {
    /// Session user, substituted for `$user`.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Make every statement starting with `prefix` fail.
    pub fn fail_on(&mut self, prefix: impl Into<String>) {
        self.failures.push(prefix.into());
    }

    /// Accept every statement starting with `prefix` without applying it.
    pub fn ignore(&mut self, prefix: impl Into<String>) {
        self.ignored.push(prefix.into());
    }

    /// Remove injected failures and ignored prefixes.
    pub fn clear_failures(&mut self) {
        self.failures.clear();
        self.ignored.clear();
    }

    /// Statements passed to `execute`, in order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Search path as the server reports it.
    pub fn search_path(&self) -> SearchPath {
        SearchPath::parse(&self.render_search_path())
    }

    /// Create `table` in the namespace unqualified names currently resolve to.
    pub fn create_table(&mut self, table: &str, columns: &[&str]) -> Result<(), DriverError> {
        let mut catalog = self.catalog.write();
        let namespace = self
            .current_schema(&catalog)
            .ok_or_else(|| DriverError::Query("no schema has been selected to create in".into()))?;

        let key = (namespace.clone(), table.to_string());
        if catalog.tables.contains_key(&key) {
            return Err(DriverError::Query(format!(
                "relation \"{table}\" already exists in schema \"{namespace}\""
            )));
        }
        catalog
            .tables
            .insert(key, columns.iter().map(|c| c.to_string()).collect());
        Ok(())
    }

    /// Drop the table an unqualified `table` currently resolves to.
    pub fn drop_table(&mut self, table: &str) -> Result<(), DriverError> {
        let mut catalog = self.catalog.write();
        let namespace = self
            .resolve_table(&catalog, table)
            .ok_or_else(|| DriverError::Query(format!("table \"{table}\" does not exist")))?;
        catalog.tables.remove(&(namespace, table.to_string()));
        Ok(())
    }

    fn render_search_path(&self) -> String {
        self.search_path
            .iter()
            .map(|entry| {
                if entry == USER_PLACEHOLDER || entry.bytes().any(|b| b.is_ascii_uppercase()) {
                    format!("\"{entry}\"")
                } else {
                    entry.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    // current_schemas(false): path entries that exist, `$user` substituted
    fn current_schemas(&self, catalog: &Catalog) -> Vec<String> {
        self.search_path
            .iter()
            .map(|entry| {
                if entry == USER_PLACEHOLDER {
                    self.user.clone()
                } else {
                    entry.clone()
                }
            })
            .filter(|name| catalog.namespaces.contains(name))
            .collect()
    }

    fn current_schema(&self, catalog: &Catalog) -> Option<String> {
        self.current_schemas(catalog).into_iter().next()
    }

    fn resolve_table(&self, catalog: &Catalog, table: &str) -> Option<String> {
        self.current_schemas(catalog)
            .into_iter()
            .find(|ns| catalog.tables.contains_key(&(ns.clone(), table.to_string())))
    }

    fn intercept(&self, sql: &str) -> Result<bool, DriverError> {
        if self.failures.iter().any(|prefix| sql.starts_with(prefix.as_str())) {
            return Err(DriverError::Query(format!("injected failure: {sql}")));
        }
        Ok(self.ignored.iter().any(|prefix| sql.starts_with(prefix.as_str())))
    }
}

fn bind<'a>(binds: &[&'a str], index: usize) -> Result<&'a str, DriverError> {
    binds
        .get(index)
        .copied()
        .ok_or_else(|| DriverError::Query(format!("missing bind parameter ${}", index + 1)))
}

#[async_trait]
impl SchemaProvider for InMemorySchemaProvider {
    type Connection = MemorySession;

    async fn execute(&self, conn: &mut MemorySession, statement: &str) -> Result<(), DriverError> {
        conn.statements.push(statement.to_string());
        if conn.intercept(statement)? {
            return Ok(());
        }

        if let Some(name) = statement.strip_prefix(sql::CREATE_SCHEMA_PREFIX) {
            let name = resolve_entry(name).into_owned();
            if !self.catalog.write().namespaces.insert(name.clone()) {
                return Err(DriverError::Query(format!("schema \"{name}\" already exists")));
            }
            return Ok(());
        }

        if let Some(name) = statement
            .strip_prefix(sql::DROP_SCHEMA_PREFIX)
            .and_then(|rest| rest.strip_suffix(sql::DROP_SCHEMA_SUFFIX))
        {
            let name = resolve_entry(name).into_owned();
            let mut catalog = self.catalog.write();
            if !catalog.namespaces.remove(&name) {
                return Err(DriverError::Query(format!("schema \"{name}\" does not exist")));
            }
            catalog.tables.retain(|(namespace, _), _| *namespace != name);
            return Ok(());
        }

        if let Some(path) = statement.strip_prefix(sql::SET_SEARCH_PATH_PREFIX) {
            conn.search_path = SearchPath::parse(path)
                .resolved()
                .map(|name| name.into_owned())
                .collect();
            return Ok(());
        }

        Err(DriverError::Query(format!("unsupported statement: {statement}")))
    }

    async fn query_text(
        &self,
        conn: &mut MemorySession,
        query: &str,
        binds: &[&str],
    ) -> Result<Vec<Option<String>>, DriverError> {
        conn.intercept(query)?;
        let catalog = self.catalog.read();

        match query {
            sql::CURRENT_SEARCH_PATH => Ok(vec![Some(conn.render_search_path())]),
            sql::CURRENT_SCHEMA => Ok(vec![conn.current_schema(&catalog)]),
            sql::LIST_NAMESPACES => Ok(catalog
                .namespaces
                .iter()
                .filter(|name| !name.starts_with("pg_"))
                .cloned()
                .map(Some)
                .collect()),
            sql::TABLE_COLUMNS => {
                let table = bind(binds, 0)?;
                Ok(conn
                    .resolve_table(&catalog, table)
                    .and_then(|ns| catalog.tables.get(&(ns, table.to_string())))
                    .map(|columns| columns.iter().cloned().map(Some).collect())
                    .unwrap_or_default())
            }
            _ => Err(DriverError::Query(format!("unsupported query: {query}"))),
        }
    }

    async fn query_count(
        &self,
        conn: &mut MemorySession,
        query: &str,
        binds: &[&str],
    ) -> Result<i64, DriverError> {
        conn.intercept(query)?;
        let catalog = self.catalog.read();

        let count = match query {
            sql::NAMESPACE_EXISTS => usize::from(catalog.namespaces.contains(bind(binds, 0)?)),
            sql::TABLE_EXISTS_IN_NAMESPACE => {
                let key = (bind(binds, 1)?.to_string(), bind(binds, 0)?.to_string());
                usize::from(catalog.tables.contains_key(&key))
            }
            sql::TABLE_EXISTS_IN_PATH => {
                let table = bind(binds, 0)?;
                conn.current_schemas(&catalog)
                    .into_iter()
                    .filter(|ns| catalog.tables.contains_key(&(ns.clone(), table.to_string())))
                    .count()
            }
            _ => return Err(DriverError::Query(format!("unsupported query: {query}"))),
        };

        Ok(count as i64)
    }
}
