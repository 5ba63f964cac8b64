//! Database provider seam.
//!
//! Users implement this trait with their PostgreSQL client; the diesel
//! binding in `schemata-diesel` is one such implementation and
//! [`InMemorySchemaProvider`](crate::memory::InMemorySchemaProvider) is
//! another, for tests.

use crate::error::DriverError;
use async_trait::async_trait;

/// Three primitive round trips every namespace operation is built from.
///
/// All statements come from [`crate::sql`]. Implementations must send
/// `binds` as bound text parameters, never splice them into the SQL.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Connection type (e.g. `diesel_async::AsyncPgConnection`).
    type Connection: Send;

    /// Run a statement that returns no rows.
    async fn execute(&self, conn: &mut Self::Connection, sql: &str) -> Result<(), DriverError>;

    /// Run a query whose single text column is named `value`.
    async fn query_text(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<Option<String>>, DriverError>;

    /// Run a query whose single bigint column is named `count`.
    async fn query_count(
        &self,
        conn: &mut Self::Connection,
        sql: &str,
        binds: &[&str],
    ) -> Result<i64, DriverError>;
}

/// Read a single text value, failing if the query returned no row.
pub(crate) async fn query_one_text<P: SchemaProvider + ?Sized>(
    provider: &P,
    conn: &mut P::Connection,
    sql: &str,
) -> Result<Option<String>, DriverError> {
    provider
        .query_text(conn, sql, &[])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| DriverError::Decode(format!("no row returned by: {sql}")))
}
