//! Session Router
//!
//! Reads and changes the search path of one database session. The prior
//! path lives in a caller-owned [`RoutingContext`], never in process-wide
//! state.
//!
//! # Usage
//!
//! ```rust,ignore
//! let router = SessionRouter::new(provider, TenancyConfig::default());
//! let mut ctx = router.context();
//!
//! router.switch(&mut conn, &mut ctx, &SearchPath::single("acme")?).await?;
//! // unqualified queries now resolve against `acme`
//! router.restore(&mut conn, &mut ctx).await?;
//! ```

use crate::config::{RouteHistory, TenancyConfig};
use crate::context::RoutingContext;
use crate::error::{DriverError, SchemaError, SchemaResult};
use crate::identifier::USER_PLACEHOLDER;
use crate::metadata::{SchemaDependent, reset_all};
use crate::provider::{SchemaProvider, query_one_text};
use crate::search_path::{SearchPath, resolve_entry};
use crate::sql;
use schemata_log::{debug, error, info};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Search-path routing for a single session at a time.
pub struct SessionRouter<P: SchemaProvider> {
    provider: Arc<P>,
    config: Arc<TenancyConfig>,
}

impl<P: SchemaProvider> SessionRouter<P> {
    /// Create a router over an injected provider.
    pub fn new(provider: Arc<P>, config: TenancyConfig) -> Self {
        Self::with_shared_config(provider, Arc::new(config))
    }

    pub(crate) fn with_shared_config(provider: Arc<P>, config: Arc<TenancyConfig>) -> Self {
        Self { provider, config }
    }

    /// Router configuration.
    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    /// Fresh routing context using the configured history.
    pub fn context(&self) -> RoutingContext {
        RoutingContext::new(self.config.history)
    }

    /// The session's search path, as reported by the server.
    pub async fn current(&self, conn: &mut P::Connection) -> SchemaResult<SearchPath> {
        let raw = query_one_text(self.provider.as_ref(), conn, sql::CURRENT_SEARCH_PATH)
            .await?
            .ok_or_else(|| DriverError::Decode("search_path is NULL".to_string()))?;
        Ok(SearchPath::parse(&raw))
    }

    /// The namespace unqualified names resolve against first, or `None`
    /// when no entry of the path exists.
    pub async fn current_namespace(&self, conn: &mut P::Connection) -> SchemaResult<Option<String>> {
        Ok(query_one_text(self.provider.as_ref(), conn, sql::CURRENT_SCHEMA).await?)
    }

    /// Point the session at `path`, remembering the current path in `ctx`.
    ///
    /// Nothing changes if validation or the namespace check fails. If the
    /// set itself fails, the previous path is re-applied and `ctx` is left
    /// as it was before the call.
    pub async fn switch(
        &self,
        conn: &mut P::Connection,
        ctx: &mut RoutingContext,
        path: &SearchPath,
    ) -> SchemaResult<()> {
        path.validate()?;
        self.check_namespaces(conn, path).await?;

        let before = self.current(conn).await?;
        let snapshot = ctx.snapshot();
        ctx.record(before.clone());
        debug!("prior search path recorded: {}", before);

        if let Err(err) = self.apply(conn, path).await {
            ctx.rollback(snapshot);
            self.reapply(conn, &before).await;
            return Err(err);
        }
        Ok(())
    }

    /// Return to the path remembered in `ctx`.
    ///
    /// With [`RouteHistory::Single`] this is a switch to the remembered path,
    /// so the path being left becomes the new prior. With
    /// [`RouteHistory::Stack`] the remembered path is popped.
    pub async fn restore(&self, conn: &mut P::Connection, ctx: &mut RoutingContext) -> SchemaResult<()> {
        match ctx.history() {
            RouteHistory::Single => {
                let prior = ctx.prior().cloned().ok_or(SchemaError::NoPriorPath)?;
                debug!("restoring search path to: {}", prior);
                self.switch(conn, ctx, &prior).await
            }
            RouteHistory::Stack => {
                let prior = ctx.pop().ok_or(SchemaError::NoPriorPath)?;
                debug!("restoring search path to: {} (depth {})", prior, ctx.depth());

                let result = match prior.validate() {
                    Ok(()) => match self.check_namespaces(conn, &prior).await {
                        Ok(()) => self.apply(conn, &prior).await,
                        Err(err) => Err(err),
                    },
                    Err(err) => Err(err),
                };
                if result.is_err() {
                    ctx.record(prior);
                }
                result
            }
        }
    }

    /// [`switch`](Self::switch), then invalidate every dependent's cached
    /// metadata. Invalidation also runs when the set failed and the previous
    /// path was re-applied.
    pub async fn switch_and_reset(
        &self,
        conn: &mut P::Connection,
        ctx: &mut RoutingContext,
        path: &SearchPath,
        dependents: &[Arc<dyn SchemaDependent>],
    ) -> SchemaResult<()> {
        let result = self.switch(conn, ctx, path).await;
        reset_after(&result, dependents);
        result
    }

    /// [`restore`](Self::restore) with metadata invalidation.
    pub async fn restore_and_reset(
        &self,
        conn: &mut P::Connection,
        ctx: &mut RoutingContext,
        dependents: &[Arc<dyn SchemaDependent>],
    ) -> SchemaResult<()> {
        let result = self.restore(conn, ctx).await;
        reset_after(&result, dependents);
        result
    }

    /// Switch to the configured default path (`"$user", public` unless changed).
    pub async fn default_path(&self, conn: &mut P::Connection, ctx: &mut RoutingContext) -> SchemaResult<()> {
        let path = self.config.default_search_path.clone();
        self.switch(conn, ctx, &path).await
    }

    /// [`default_path`](Self::default_path) with metadata invalidation.
    pub async fn default_path_and_reset(
        &self,
        conn: &mut P::Connection,
        ctx: &mut RoutingContext,
        dependents: &[Arc<dyn SchemaDependent>],
    ) -> SchemaResult<()> {
        let path = self.config.default_search_path.clone();
        self.switch_and_reset(conn, ctx, &path, dependents).await
    }

    /// Run `f` with the session routed to `path`, restoring afterwards
    /// whether `f` succeeds or fails.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let count = router
    ///     .scoped(&mut conn, &mut ctx, &path, &[], |conn| {
    ///         Box::pin(async move { count_widgets(conn).await })
    ///     })
    ///     .await?;
    /// ```
    pub async fn scoped<F, T>(
        &self,
        conn: &mut P::Connection,
        ctx: &mut RoutingContext,
        path: &SearchPath,
        dependents: &[Arc<dyn SchemaDependent>],
        f: F,
    ) -> SchemaResult<T>
    where
        F: FnOnce(&mut P::Connection) -> Pin<Box<dyn Future<Output = SchemaResult<T>> + Send + '_>>,
    {
        self.switch_and_reset(conn, ctx, path, dependents).await?;

        let outcome = f(conn).await;
        let restored = self.restore_and_reset(conn, ctx, dependents).await;

        match (outcome, restored) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(restore_err)) => Err(restore_err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(restore_err)) => {
                error!("search path not restored after failure in {}: {}", path, restore_err);
                Err(err)
            }
        }
    }

    async fn apply(&self, conn: &mut P::Connection, path: &SearchPath) -> SchemaResult<()> {
        info!("setting search path to: {}", path);
        self.provider
            .execute(conn, &sql::set_search_path(path))
            .await
            .map_err(|cause| SchemaError::InvalidPath {
                path: path.to_string(),
                cause,
            })
    }

    async fn reapply(&self, conn: &mut P::Connection, before: &SearchPath) {
        let outcome = match before.validate() {
            Ok(()) => self.apply(conn, before).await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            error!("could not return search path to {}: {}", before, err);
        }
    }

    async fn check_namespaces(&self, conn: &mut P::Connection, path: &SearchPath) -> SchemaResult<()> {
        if !self.config.verify_namespaces {
            return Ok(());
        }

        for entry in path.entries().iter().filter(|e| e.as_str() != USER_PLACEHOLDER) {
            let resolved = resolve_entry(entry);
            let count = self
                .provider
                .query_count(conn, sql::NAMESPACE_EXISTS, &[resolved.as_ref()])
                .await?;
            if count == 0 {
                return Err(SchemaError::UnknownNamespace {
                    path: path.to_string(),
                    namespace: entry.clone(),
                });
            }
        }
        Ok(())
    }
}

// Invalidate whenever the session's path was touched: after a successful
// change, or after a failed set that re-applied the previous path.
fn reset_after(result: &SchemaResult<()>, dependents: &[Arc<dyn SchemaDependent>]) {
    if matches!(result, Ok(()) | Err(SchemaError::InvalidPath { .. })) {
        reset_all(dependents);
    }
}
