//! Loaders run inside a freshly created tenant namespace.
//!
//! A loader receives the connection while it is routed to the new tenant, so
//! unqualified DDL and inserts land in the tenant's namespace.

use crate::error::BoxError;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by closure loaders.
pub type LoadFuture<'c> = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'c>>;

/// Applies DDL or data to the namespace the connection is routed to.
#[async_trait]
pub trait TenantLoader<C: Send>: Send + Sync {
    /// Run against the active search path.
    async fn load(&self, conn: &mut C) -> Result<(), BoxError>;
}

/// Loader backed by a closure. Build one with [`loader_fn`].
pub struct FnLoader<F>(F);

/// Wrap a closure as a [`TenantLoader`].
///
/// # Examples
///
/// ```rust,ignore
/// let seeds = loader_fn::<AsyncPgConnection, _>(|conn| {
///     Box::pin(async move {
///         diesel::sql_query("INSERT INTO settings (key) VALUES ('theme')")
///             .execute(conn)
///             .await?;
///         Ok(())
///     })
/// });
/// ```
pub fn loader_fn<C, F>(f: F) -> FnLoader<F>
where
    C: Send,
    F: for<'c> Fn(&'c mut C) -> LoadFuture<'c> + Send + Sync,
{
    FnLoader(f)
}

#[async_trait]
impl<C, F> TenantLoader<C> for FnLoader<F>
where
    C: Send,
    F: for<'c> Fn(&'c mut C) -> LoadFuture<'c> + Send + Sync,
{
    async fn load(&self, conn: &mut C) -> Result<(), BoxError> {
        (self.0)(conn).await
    }
}
