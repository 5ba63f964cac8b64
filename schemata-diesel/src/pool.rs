//! Connection pool whose checkouts carry their own routing context.

use crate::{DieselError, DieselResult, PgConfig};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig, RecyclingMethod};
use schemata_core::{RoutingContext, TenancyConfig, sql};
use schemata_log::{debug, info};
use std::borrow::Cow;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// PostgreSQL pool for routed sessions.
///
/// With `reset_search_path_on_recycle` set, every connection returned to
/// the pool is pointed back at the default search path before it is handed
/// out again, so a request never inherits another request's tenant.
pub struct TenantPool {
    pool: Pool<AsyncPgConnection>,
    config: Arc<PgConfig>,
    tenancy: Arc<TenancyConfig>,
}

impl TenantPool {
    /// Create a new pool.
    pub async fn new(config: PgConfig, tenancy: TenancyConfig) -> DieselResult<Self> {
        info!("Creating PostgreSQL tenant pool");
        debug!("Pool size: {}, URL: {}", config.pool_size, config.redacted_url());

        let mut manager_config = ManagerConfig::default();
        if config.reset_search_path_on_recycle {
            tenancy.default_search_path.validate()?;
            let reset = sql::set_search_path(&tenancy.default_search_path);
            debug!("Recycled connections run: {}", reset);
            manager_config.recycling_method = RecyclingMethod::CustomQuery(Cow::Owned(reset));
        }

        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            config.connection_url(),
            manager_config,
        );

        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| DieselError::Pool(e.to_string()))?;

        info!("PostgreSQL tenant pool created successfully");

        Ok(Self {
            pool,
            config: Arc::new(config),
            tenancy: Arc::new(tenancy),
        })
    }

    /// Check out a connection with a fresh routing context.
    pub async fn checkout(&self) -> DieselResult<TenantConnection> {
        debug!("Acquiring PostgreSQL connection from pool");
        let conn = tokio::time::timeout(self.config.connect_timeout, self.pool.get())
            .await
            .map_err(|_| {
                DieselError::Timeout(format!(
                    "no connection available within {}s",
                    self.config.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| DieselError::Pool(e.to_string()))?;

        Ok(TenantConnection {
            conn,
            routing: RoutingContext::new(self.tenancy.history),
        })
    }

    /// Get pool statistics.
    pub fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            size: status.size,
            available: status.available,
            waiting: status.waiting,
            max_size: status.max_size,
        }
    }

    /// Connection settings.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Tenancy configuration for checkouts.
    pub fn tenancy(&self) -> &TenancyConfig {
        &self.tenancy
    }
}

/// One pooled connection and the routing context that belongs to it.
///
/// # Examples
///
/// ```rust,ignore
/// let mut checkout = pool.checkout().await?;
/// let (conn, ctx) = checkout.split();
///
/// router.switch(conn, ctx, &SearchPath::single("acme")?).await?;
/// let widgets = widgets::table.load::<Widget>(conn).await?;
/// router.restore(conn, ctx).await?;
/// ```
pub struct TenantConnection {
    conn: Object<AsyncPgConnection>,
    routing: RoutingContext,
}

impl TenantConnection {
    /// Borrow the connection and its routing context together.
    pub fn split(&mut self) -> (&mut AsyncPgConnection, &mut RoutingContext) {
        (&mut *self.conn, &mut self.routing)
    }

    /// Routing context of this checkout.
    pub fn routing(&self) -> &RoutingContext {
        &self.routing
    }

    /// Give up the routing context and keep the pooled connection.
    pub fn into_inner(self) -> Object<AsyncPgConnection> {
        self.conn
    }
}

impl Deref for TenantConnection {
    type Target = AsyncPgConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for TenantConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

/// Connection pool statistics.
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Current number of connections.
    pub size: usize,
    /// Number of available (idle) connections.
    pub available: usize,
    /// Number of tasks waiting for a connection.
    pub waiting: usize,
    /// Maximum pool size.
    pub max_size: usize,
}

impl PoolStatus {
    /// Get the utilization percentage.
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            (self.size.saturating_sub(self.available) as f64 / self.max_size as f64) * 100.0
        }
    }

    /// Check if the pool is under pressure.
    pub fn is_under_pressure(&self) -> bool {
        self.waiting > 0 || self.utilization() > 80.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_pool_status() {
        let status = PoolStatus {
            size: 10,
            available: 1,
            waiting: 0,
            max_size: 10,
        };
        assert!((status.utilization() - 90.0).abs() < f64::EPSILON);
        assert!(status.is_under_pressure());

        let idle = PoolStatus {
            size: 2,
            available: 2,
            waiting: 0,
            max_size: 10,
        };
        assert_eq!(idle.utilization(), 0.0);
        assert!(!idle.is_under_pressure());
    }

    #[tokio::test]
    async fn test_unsafe_default_path_rejected() {
        let tenancy = TenancyConfig {
            default_search_path: schemata_core::SearchPath::parse("public; DROP SCHEMA acme"),
            ..TenancyConfig::default()
        };
        let result = TenantPool::new(PgConfig::default(), tenancy.clone()).await;
        assert!(matches!(result, Err(DieselError::Schema(_))));

        // without the recycle reset the path is never sent from here
        let config = PgConfig::default().reset_search_path_on_recycle(false);
        assert_ok!(TenantPool::new(config, tenancy).await);
    }

    #[tokio::test]
    async fn test_pool_builds_without_connecting() {
        let config = PgConfig::default().pool_size(3);
        let pool = assert_ok!(TenantPool::new(config, TenancyConfig::default()).await);
        let status = pool.status();
        assert_eq!(status.size, 0);
        assert_eq!(status.max_size, 3);
        assert_eq!(pool.tenancy().history, schemata_core::RouteHistory::Single);
    }
}
