//! Tenant Provisioner
//!
//! Creates a tenant namespace, loads its initial schema while the session is
//! routed to it, and always routes the session back before returning.
//!
//! ```text
//! create namespace -> switch (+ reset) -> verify -> schema -> seed -> on_loaded
//!                                           \__________________________/
//!                                                        |
//!                                        restore (+ reset), success or not
//! ```

use crate::config::TenancyConfig;
use crate::context::RoutingContext;
use crate::error::{SchemaError, SchemaResult};
use crate::loader::TenantLoader;
use crate::metadata::SchemaDependent;
use crate::oracle::ExistenceOracle;
use crate::provider::SchemaProvider;
use crate::registry::NamespaceRegistry;
use crate::router::SessionRouter;
use crate::search_path::SearchPath;
use chrono::{DateTime, Utc};
use schemata_log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Loader shared by every tenant a provisioner creates.
pub type SharedLoader<C> = Arc<dyn TenantLoader<C>>;

/// Outcome of a successful [`TenantProvisioner::create_tenant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedTenant {
    /// Namespace holding the tenant's data
    pub namespace: String,
    /// Whether a seed loader ran
    pub seeded: bool,
    /// When loading finished
    pub provisioned_at: DateTime<Utc>,
}

/// Tenant lifecycle built on the registry, router and oracle.
pub struct TenantProvisioner<P: SchemaProvider> {
    registry: NamespaceRegistry<P>,
    router: SessionRouter<P>,
    oracle: ExistenceOracle<P>,
    schema_loader: SharedLoader<P::Connection>,
    seed_loader: Option<SharedLoader<P::Connection>>,
    config: Arc<TenancyConfig>,
}

impl<P: SchemaProvider> TenantProvisioner<P> {
    /// Start building a provisioner over `provider`.
    pub fn builder(provider: Arc<P>) -> TenantProvisionerBuilder<P> {
        TenantProvisionerBuilder::new(provider)
    }

    /// Create a tenant named `name`.
    ///
    /// The schema loader, then the seed loader (if configured), then
    /// `on_loaded` run with `conn` routed to the new namespace. Whatever
    /// happens after routing, the session is restored and `dependents` are
    /// reset before this returns.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::InjectionRisk`] / [`SchemaError::NamespaceCreateFailed`]:
    ///   nothing changed.
    /// - [`SchemaError::TenantRoutingFailed`]: the namespace exists but the
    ///   session could not be routed to it. It is not removed.
    /// - [`SchemaError::TenantProvisioningFailed`]: verification or a loader
    ///   failed. The session has been restored; the namespace and anything
    ///   already loaded into it remain.
    pub async fn create_tenant(
        &self,
        conn: &mut P::Connection,
        ctx: &mut RoutingContext,
        name: &str,
        dependents: &[Arc<dyn SchemaDependent>],
        on_loaded: Option<&dyn TenantLoader<P::Connection>>,
    ) -> SchemaResult<ProvisionedTenant> {
        self.registry.create(conn, name).await?;

        let target = SearchPath::single(name)?;
        self.router
            .switch_and_reset(conn, ctx, &target, dependents)
            .await
            .map_err(|cause| SchemaError::TenantRoutingFailed {
                tenant: name.to_string(),
                cause: Box::new(cause),
            })?;

        let loaded = self.verify_and_load(conn, &target, on_loaded).await;
        let restored = self.router.restore_and_reset(conn, ctx, dependents).await;

        match (loaded, restored) {
            (Ok(seeded), Ok(())) => {
                info!("tenant {} provisioned", name);
                Ok(ProvisionedTenant {
                    namespace: name.to_string(),
                    seeded,
                    provisioned_at: Utc::now(),
                })
            }
            (Ok(_), Err(restore_err)) => Err(restore_err),
            (Err(cause), restored) => {
                if let Err(restore_err) = restored {
                    error!("session not restored after failing to provision {}: {}", name, restore_err);
                }
                Err(SchemaError::TenantProvisioningFailed {
                    tenant: name.to_string(),
                    cause: Box::new(cause),
                })
            }
        }
    }

    /// Drop the tenant's namespace and everything in it.
    pub async fn drop_tenant(&self, conn: &mut P::Connection, name: &str) -> SchemaResult<()> {
        self.registry.drop(conn, name).await
    }

    /// Namespaces other than system and shared ones.
    pub async fn list_tenants(&self, conn: &mut P::Connection) -> SchemaResult<Vec<String>> {
        let mut names = self.registry.list(conn).await?;
        names.retain(|name| !self.config.is_shared(name));
        Ok(names)
    }

    /// See [`ExistenceOracle::exists`].
    pub async fn exists(&self, conn: &mut P::Connection, table: &str) -> SchemaResult<bool> {
        self.oracle.exists(conn, table).await
    }

    /// See [`SessionRouter::current_namespace`].
    pub async fn current_namespace(&self, conn: &mut P::Connection) -> SchemaResult<Option<String>> {
        self.router.current_namespace(conn).await
    }

    /// Fresh routing context for one connection checkout.
    pub fn context(&self) -> RoutingContext {
        self.router.context()
    }

    /// Namespace registry used for create and drop.
    pub fn registry(&self) -> &NamespaceRegistry<P> {
        &self.registry
    }

    /// Router used to enter and leave new tenants.
    pub fn router(&self) -> &SessionRouter<P> {
        &self.router
    }

    /// Table existence checks.
    pub fn oracle(&self) -> &ExistenceOracle<P> {
        &self.oracle
    }

    /// Tenancy configuration.
    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    async fn verify_and_load(
        &self,
        conn: &mut P::Connection,
        target: &SearchPath,
        on_loaded: Option<&dyn TenantLoader<P::Connection>>,
    ) -> SchemaResult<bool> {
        let actual = self.router.current(conn).await?;
        if !actual.resolves_to(target) {
            return Err(SchemaError::TenantVerificationFailed {
                expected: target.to_string(),
                actual: actual.to_string(),
            });
        }

        self.schema_loader.load(conn).await.map_err(SchemaError::Load)?;

        let seeded = match &self.seed_loader {
            Some(seed) => {
                seed.load(conn).await.map_err(SchemaError::Load)?;
                true
            }
            None => false,
        };

        if let Some(callback) = on_loaded {
            callback.load(conn).await.map_err(SchemaError::Load)?;
        }

        Ok(seeded)
    }
}

/// Builder for [`TenantProvisioner`].
pub struct TenantProvisionerBuilder<P: SchemaProvider> {
    provider: Arc<P>,
    config: TenancyConfig,
    schema_loader: Option<SharedLoader<P::Connection>>,
    seed_loader: Option<SharedLoader<P::Connection>>,
}

impl<P: SchemaProvider> TenantProvisionerBuilder<P> {
    /// Start a builder with the default configuration.
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            config: TenancyConfig::default(),
            schema_loader: None,
            seed_loader: None,
        }
    }

    /// Set the tenancy configuration.
    pub fn with_config(mut self, config: TenancyConfig) -> Self {
        self.config = config;
        self
    }

    /// Loader applying each tenant's initial DDL. Required.
    pub fn with_schema_loader<L>(mut self, loader: L) -> Self
    where
        L: TenantLoader<P::Connection> + 'static,
    {
        self.schema_loader = Some(Arc::new(loader));
        self
    }

    /// Loader inserting each tenant's initial rows.
    pub fn with_seed_loader<L>(mut self, loader: L) -> Self
    where
        L: TenantLoader<P::Connection> + 'static,
    {
        self.seed_loader = Some(Arc::new(loader));
        self
    }

    /// Fails with [`SchemaError::Config`] when no schema loader was given.
    pub fn build(self) -> SchemaResult<TenantProvisioner<P>> {
        let schema_loader = self
            .schema_loader
            .ok_or_else(|| SchemaError::Config("a schema loader is required".to_string()))?;
        let config = Arc::new(self.config);

        Ok(TenantProvisioner {
            registry: NamespaceRegistry::new(self.provider.clone()),
            router: SessionRouter::with_shared_config(self.provider.clone(), config.clone()),
            oracle: ExistenceOracle::new(self.provider),
            schema_loader,
            seed_loader: self.seed_loader,
            config,
        })
    }
}
