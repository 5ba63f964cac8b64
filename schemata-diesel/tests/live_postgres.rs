//! Tests against a real PostgreSQL server.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -p schemata-diesel -- --ignored`.

use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};
use schemata_core::prelude::*;
use schemata_core::BoxError;
use schemata_diesel::{DieselSchemaProvider, PgConfig, TenantPool};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_test::{assert_err, assert_ok};

fn unique_name(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{prefix}{nanos}")
}

fn provisioner() -> TenantProvisioner<DieselSchemaProvider> {
    TenantProvisioner::builder(Arc::new(DieselSchemaProvider))
        .with_schema_loader(loader_fn::<AsyncPgConnection, _>(|conn| {
            Box::pin(async move {
                conn.batch_execute("CREATE TABLE widgets (id BIGSERIAL PRIMARY KEY, name TEXT)")
                    .await?;
                Ok::<(), BoxError>(())
            })
        }))
        .build()
        .unwrap()
}

async fn pool() -> TenantPool {
    TenantPool::new(PgConfig::from_env().unwrap().pool_size(2), TenancyConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_tenant_round_trip() {
    let pool = pool().await;
    let provisioner = provisioner();
    let tenant = unique_name("acme");

    let mut checkout = pool.checkout().await.unwrap();
    let (conn, ctx) = checkout.split();
    let before = provisioner.router().current(conn).await.unwrap();

    provisioner
        .create_tenant(conn, ctx, &tenant, &[], None)
        .await
        .unwrap();

    assert_eq!(provisioner.router().current(conn).await.unwrap(), before);
    assert!(provisioner.exists(conn, &format!("{tenant}.widgets")).await.unwrap());
    assert!(!provisioner.exists(conn, "widgets").await.unwrap());
    assert!(provisioner.list_tenants(conn).await.unwrap().contains(&tenant));

    assert_ok!(provisioner.drop_tenant(conn, &tenant).await);
    assert!(!provisioner.list_tenants(conn).await.unwrap().contains(&tenant));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_switch_to_missing_namespace_is_rejected() {
    let pool = pool().await;
    let provisioner = provisioner();

    let mut checkout = pool.checkout().await.unwrap();
    let (conn, ctx) = checkout.split();
    let before = provisioner.router().current(conn).await.unwrap();

    let missing = SearchPath::single(unique_name("missing")).unwrap();
    let err = assert_err!(provisioner.router().switch(conn, ctx, &missing).await);

    assert!(err.is_invalid_path());
    assert_eq!(provisioner.router().current(conn).await.unwrap(), before);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_column_cache_follows_tenant() {
    let pool = pool().await;
    let provisioner = provisioner();
    let first = unique_name("first");
    let second = unique_name("second");

    let mut checkout = pool.checkout().await.unwrap();
    let (conn, ctx) = checkout.split();

    let narrow = loader_fn::<AsyncPgConnection, _>(|conn| {
        Box::pin(async move {
            conn.batch_execute("CREATE TABLE items (id BIGINT, sku TEXT)").await?;
            Ok::<(), BoxError>(())
        })
    });
    let wide = loader_fn::<AsyncPgConnection, _>(|conn| {
        Box::pin(async move {
            conn.batch_execute("CREATE TABLE items (id BIGINT, name TEXT, price NUMERIC)")
                .await?;
            Ok::<(), BoxError>(())
        })
    });
    provisioner.create_tenant(conn, ctx, &first, &[], Some(&narrow)).await.unwrap();
    provisioner.create_tenant(conn, ctx, &second, &[], Some(&wide)).await.unwrap();

    let items = Arc::new(ColumnCache::new("items"));
    let dependents: Vec<Arc<dyn SchemaDependent>> = vec![items.clone()];
    let router = provisioner.router();

    router
        .switch_and_reset(conn, ctx, &SearchPath::single(first.as_str()).unwrap(), &dependents)
        .await
        .unwrap();
    assert_eq!(items.columns(&DieselSchemaProvider, conn).await.unwrap(), ["id", "sku"]);

    router
        .switch_and_reset(conn, ctx, &SearchPath::single(second.as_str()).unwrap(), &dependents)
        .await
        .unwrap();
    assert_eq!(
        items.columns(&DieselSchemaProvider, conn).await.unwrap(),
        ["id", "name", "price"]
    );

    router.default_path(conn, ctx).await.unwrap();
    for tenant in [&first, &second] {
        provisioner.drop_tenant(conn, tenant).await.unwrap();
    }
}
