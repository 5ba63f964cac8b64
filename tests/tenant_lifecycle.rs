//! Integration tests for the tenant lifecycle.
//!
//! Runs create, route, check and drop end to end through the facade against
//! the in-memory provider.

use schemata::prelude::*;
use schemata::{BoxError, InMemorySchemaProvider, MemorySession, assert_safe};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

type TableSpec = (&'static str, &'static [&'static str]);

fn create_tables(tables: &'static [TableSpec]) -> impl TenantLoader<MemorySession> {
    loader_fn::<MemorySession, _>(move |conn| {
        Box::pin(async move {
            for (table, columns) in tables {
                conn.create_table(table, columns)?;
            }
            Ok::<(), BoxError>(())
        })
    })
}

fn setup() -> (Arc<InMemorySchemaProvider>, TenantProvisioner<InMemorySchemaProvider>) {
    let provider = Arc::new(InMemorySchemaProvider::new());
    let provisioner = TenantProvisioner::builder(provider.clone())
        .with_schema_loader(create_tables(&[("widgets", &["id", "name"])]))
        .build()
        .unwrap();
    (provider, provisioner)
}

// =============================================================================
// Identifier Validation
// =============================================================================

#[test]
fn test_identifier_rule() {
    for safe in ["a", "acme", "Acme2", "tenant1", "T", "$user"] {
        assert!(assert_safe(safe).is_ok(), "{safe} should be accepted");
    }

    for unsafe_name in [
        "",
        "1acme",
        "acme_corp",
        "acme-corp",
        "acme corp",
        "acme;",
        "\"acme\"",
        "acme'--",
        "$USER",
        "$user ",
        "public; DROP SCHEMA acme CASCADE",
        "ácme",
    ] {
        assert!(
            matches!(assert_safe(unsafe_name), Err(SchemaError::InjectionRisk(_))),
            "{unsafe_name:?} should be rejected"
        );
    }
}

// =============================================================================
// Session Routing
// =============================================================================

#[tokio::test]
async fn test_switch_then_restore_for_many_paths() {
    let (provider, provisioner) = setup();
    let mut conn = provider.session();
    let mut ctx = provisioner.context();
    let router = provisioner.router();

    for name in ["acme", "globex", "initech"] {
        provisioner.registry().create(&mut conn, name).await.unwrap();
    }
    let before = router.current(&mut conn).await.unwrap();

    let paths = [
        SearchPath::single("acme").unwrap(),
        SearchPath::new(["globex", "public"]).unwrap(),
        SearchPath::new(["$user", "initech", "public"]).unwrap(),
        SearchPath::postgres_default(),
    ];
    for path in &paths {
        assert_ok!(router.switch(&mut conn, &mut ctx, path).await);
        assert_ok!(router.restore(&mut conn, &mut ctx).await);
        assert_eq!(router.current(&mut conn).await.unwrap(), before);
    }
}

#[tokio::test]
async fn test_failed_switch_leaves_path_unchanged() {
    let (provider, provisioner) = setup();
    let mut conn = provider.session();
    let mut ctx = provisioner.context();
    let router = provisioner.router();
    let before = router.current(&mut conn).await.unwrap();

    // strict check: namespace does not exist
    let missing = SearchPath::single("nowhere").unwrap();
    let err = assert_err!(router.switch(&mut conn, &mut ctx, &missing).await);
    assert!(err.is_invalid_path());
    assert_eq!(router.current(&mut conn).await.unwrap(), before);

    // server rejects the set
    provisioner.registry().create(&mut conn, "acme").await.unwrap();
    conn.fail_on("SET search_path = acme");
    let err = assert_err!(
        router
            .switch(&mut conn, &mut ctx, &SearchPath::single("acme").unwrap())
            .await
    );
    assert!(matches!(err, SchemaError::InvalidPath { .. }));
    assert_eq!(router.current(&mut conn).await.unwrap(), before);
}

// =============================================================================
// Tenant Lifecycle
// =============================================================================

#[tokio::test]
async fn test_create_tenant_never_leaves_session_in_tenant() {
    let (provider, provisioner) = setup();
    let mut conn = provider.session();
    let mut ctx = provisioner.context();

    let before = provisioner.current_namespace(&mut conn).await.unwrap();
    provisioner
        .create_tenant(&mut conn, &mut ctx, "acme", &[], None)
        .await
        .unwrap();

    let after = provisioner.current_namespace(&mut conn).await.unwrap();
    assert_eq!(after, before);
    assert_ne!(after.as_deref(), Some("acme"));
}

#[tokio::test]
async fn test_exists_is_tenant_aware() {
    let (provider, provisioner) = setup();
    let mut conn = provider.session();
    let mut ctx = provisioner.context();
    let router = provisioner.router();

    provisioner
        .create_tenant(&mut conn, &mut ctx, "acme", &[], None)
        .await
        .unwrap();
    assert!(provisioner.exists(&mut conn, "acme.widgets").await.unwrap());
    assert!(!provisioner.exists(&mut conn, "acme.gadgets").await.unwrap());

    // a tenant whose loader never created widgets
    provisioner.registry().create(&mut conn, "globex").await.unwrap();
    router
        .switch(&mut conn, &mut ctx, &SearchPath::single("globex").unwrap())
        .await
        .unwrap();
    assert!(!provisioner.exists(&mut conn, "widgets").await.unwrap());

    router
        .switch(&mut conn, &mut ctx, &SearchPath::single("acme").unwrap())
        .await
        .unwrap();
    assert!(provisioner.exists(&mut conn, "widgets").await.unwrap());
}

#[tokio::test]
async fn test_drop_tenant_removes_it_from_listing() {
    let (provider, provisioner) = setup();
    let mut conn = provider.session();
    let mut ctx = provisioner.context();

    provisioner
        .create_tenant(&mut conn, &mut ctx, "acme", &[], None)
        .await
        .unwrap();
    assert!(provisioner.list_tenants(&mut conn).await.unwrap().contains(&"acme".to_string()));

    provisioner.drop_tenant(&mut conn, "acme").await.unwrap();
    let tenants = provisioner.list_tenants(&mut conn).await.unwrap();
    assert!(!tenants.contains(&"acme".to_string()));
    assert!(!provider.has_table("acme", "widgets"));
}

#[tokio::test]
async fn test_model_metadata_follows_tenant() {
    let (provider, provisioner) = setup();
    let mut conn = provider.session();
    let mut ctx = provisioner.context();
    let router = provisioner.router();

    let model = Arc::new(ColumnCache::new("items"));
    let dependents: Vec<Arc<dyn SchemaDependent>> = vec![model.clone()];

    let legacy = create_tables(&[("items", &["id", "sku", "legacy_code"])]);
    provisioner
        .create_tenant(&mut conn, &mut ctx, "tenant0", &[], Some(&legacy))
        .await
        .unwrap();
    router
        .switch_and_reset(&mut conn, &mut ctx, &SearchPath::single("tenant0").unwrap(), &dependents)
        .await
        .unwrap();
    assert_eq!(
        model.columns(provider.as_ref(), &mut conn).await.unwrap(),
        ["id", "sku", "legacy_code"]
    );

    let current = create_tables(&[("items", &["id", "name"])]);
    provisioner
        .create_tenant(&mut conn, &mut ctx, "tenant1", &dependents, Some(&current))
        .await
        .unwrap();

    router
        .switch_and_reset(&mut conn, &mut ctx, &SearchPath::single("tenant1").unwrap(), &dependents)
        .await
        .unwrap();
    assert_eq!(
        model.columns(provider.as_ref(), &mut conn).await.unwrap(),
        ["id", "name"]
    );
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_share_routing() {
    let (provider, provisioner) = setup();
    let provisioner = Arc::new(provisioner);
    let mut setup_conn = provider.session();
    let mut setup_ctx = provisioner.context();
    for name in ["acme", "globex"] {
        provisioner
            .create_tenant(&mut setup_conn, &mut setup_ctx, name, &[], None)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for name in ["acme", "globex"] {
        let provider = provider.clone();
        let provisioner = provisioner.clone();
        handles.push(tokio::spawn(async move {
            let mut conn = provider.session();
            let mut ctx = provisioner.context();
            let path = SearchPath::single(name).unwrap();
            let router = provisioner.router();

            for _ in 0..20 {
                router.switch(&mut conn, &mut ctx, &path).await.unwrap();
                let seen = router.current_namespace(&mut conn).await.unwrap();
                assert_eq!(seen.as_deref(), Some(name));
                router.restore(&mut conn, &mut ctx).await.unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}
