//! [`SchemaProvider`] over `diesel-async`'s PostgreSQL connection.

use crate::error::driver_error;
use async_trait::async_trait;
use diesel::QueryableByName;
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{BigInt, Nullable, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl, SimpleAsyncConnection};
use schemata_core::{DriverError, SchemaProvider};
use schemata_log::trace;

#[derive(QueryableByName)]
struct TextRow {
    #[diesel(sql_type = Nullable<Text>)]
    value: Option<String>,
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

/// Runs the core's statements on an [`AsyncPgConnection`].
///
/// Statements without rows go through the simple query protocol; queries
/// bind every value as `text`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DieselSchemaProvider;

impl DieselSchemaProvider {
    /// Create a provider.
    pub fn new() -> Self {
        Self
    }
}

fn bound_query<'a>(sql: &str, binds: &[&str]) -> BoxedSqlQuery<'a, Pg, SqlQuery> {
    binds.iter().fold(
        diesel::sql_query(sql).into_boxed::<Pg>(),
        |query, value| query.bind::<Text, _>(value.to_string()),
    )
}

#[async_trait]
impl SchemaProvider for DieselSchemaProvider {
    type Connection = AsyncPgConnection;

    async fn execute(&self, conn: &mut AsyncPgConnection, sql: &str) -> Result<(), DriverError> {
        trace!("execute: {}", sql);
        conn.batch_execute(sql).await.map_err(driver_error)
    }

    async fn query_text(
        &self,
        conn: &mut AsyncPgConnection,
        sql: &str,
        binds: &[&str],
    ) -> Result<Vec<Option<String>>, DriverError> {
        trace!("query: {} {:?}", sql, binds);
        let rows: Vec<TextRow> = bound_query(sql, binds)
            .load(conn)
            .await
            .map_err(driver_error)?;
        Ok(rows.into_iter().map(|row| row.value).collect())
    }

    async fn query_count(
        &self,
        conn: &mut AsyncPgConnection,
        sql: &str,
        binds: &[&str],
    ) -> Result<i64, DriverError> {
        trace!("query: {} {:?}", sql, binds);
        let rows: Vec<CountRow> = bound_query(sql, binds)
            .load(conn)
            .await
            .map_err(driver_error)?;
        rows.into_iter()
            .next()
            .map(|row| row.count)
            .ok_or_else(|| DriverError::Decode(format!("no count returned by: {sql}")))
    }
}
