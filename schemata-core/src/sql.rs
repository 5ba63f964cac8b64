//! Statements issued against the database.
//!
//! Values are bound as `$1`, `$2`. Identifiers are interpolated only by the
//! builders below, whose callers validate them first. Text queries name their
//! single output column `value`, counting queries name it `count`.

use crate::search_path::SearchPath;

/// Namespaces not reserved by the system (`pg_*`).
pub const LIST_NAMESPACES: &str =
    "SELECT nspname AS value FROM pg_namespace WHERE nspname !~ '^pg_' ORDER BY nspname";

/// The session's search path as text.
pub const CURRENT_SEARCH_PATH: &str = "SELECT current_setting('search_path') AS value";

/// The namespace unqualified names resolve against first (NULL if none).
pub const CURRENT_SCHEMA: &str = "SELECT current_schema() AS value";

/// `$1` = namespace name.
pub const NAMESPACE_EXISTS: &str =
    "SELECT COUNT(*) AS count FROM pg_namespace WHERE nspname = $1";

/// `$1` = table name, `$2` = namespace name.
pub const TABLE_EXISTS_IN_NAMESPACE: &str =
    "SELECT COUNT(*) AS count FROM pg_tables WHERE tablename = $1 AND schemaname = $2";

/// `$1` = table name, restricted to namespaces on the active search path.
pub const TABLE_EXISTS_IN_PATH: &str = "SELECT COUNT(*) AS count FROM pg_tables \
     WHERE tablename = $1 AND schemaname = ANY (current_schemas(false))";

/// `$1` = unqualified table name, resolved through the active search path.
pub const TABLE_COLUMNS: &str = "SELECT attname::text AS value FROM pg_attribute \
     WHERE attrelid = to_regclass($1) AND attnum > 0 AND NOT attisdropped ORDER BY attnum";

/// Prefix of [`create_schema`] statements.
pub const CREATE_SCHEMA_PREFIX: &str = "CREATE SCHEMA ";

/// Prefix of [`drop_schema`] statements.
pub const DROP_SCHEMA_PREFIX: &str = "DROP SCHEMA ";

/// Suffix of [`drop_schema`] statements.
pub const DROP_SCHEMA_SUFFIX: &str = " CASCADE;";

/// Prefix of [`set_search_path`] statements.
pub const SET_SEARCH_PATH_PREFIX: &str = "SET search_path = ";

/// `CREATE SCHEMA <name>`
pub fn create_schema(name: &str) -> String {
    format!("{CREATE_SCHEMA_PREFIX}{name}")
}

/// `DROP SCHEMA <name> CASCADE;`
pub fn drop_schema(name: &str) -> String {
    format!("{DROP_SCHEMA_PREFIX}{name}{DROP_SCHEMA_SUFFIX}")
}

/// `SET search_path = <entries>`
pub fn set_search_path(path: &SearchPath) -> String {
    format!("{SET_SEARCH_PATH_PREFIX}{}", path.to_sql())
}
