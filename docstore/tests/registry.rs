mod common;

use common::{file_registry, id, mem_registry};
use docstore::{DocstoreError, DocumentStore, HandleState, Identifier, Registry, StoreConfig};
use futures::FutureExt;
use serde_json::json;
use std::sync::Arc;

// --------------------------------------------------------------------
// Identifier resolution
//

#[tokio::test]
async fn test_same_identifier_same_state() {
    let registry = mem_registry();
    let first = registry.get_or_create(&id("app.users"));
    let second = registry.get_or_create(&id("app/users"));
    assert!(Arc::ptr_eq(&first, &second));

    let other = registry.get_or_create(&id("app.groups"));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(registry.identifiers(), vec![id("app.groups"), id("app.users")]);
}

#[tokio::test]
async fn test_unregistered_identifier() {
    let registry = mem_registry();
    let doc = id("app.unknown");

    assert!(!registry.contains(&doc));
    assert!(matches!(
        registry.get(&doc),
        Err(DocstoreError::UnregisteredIdentifier(missing)) if missing == doc
    ));
    assert!(matches!(
        registry.existing_handle(&doc, &json!(null)),
        Err(DocstoreError::UnregisteredIdentifier(_))
    ));

    registry.handle(&doc, &json!(null));
    assert!(registry.contains(&doc));
    assert!(registry.existing_handle(&doc, &json!(null)).is_ok());
}

#[tokio::test]
async fn test_storage_aliases_share_a_directory() {
    let (_tmp, registry) = file_registry();
    let app = id("app.users");
    let other = id("other.users");
    registry.get_or_create(&app);
    assert!(registry.storage_aliases(&app).is_empty());

    registry.get_or_create(&other);
    registry.get_or_create(&id("app.groups"));
    assert_eq!(registry.storage_aliases(&app), vec![other.clone()]);
    assert_eq!(registry.storage_aliases(&other), vec![app.clone()]);
    assert_eq!(
        registry.store().primary_path(&app),
        registry.store().primary_path(&other)
    );

    // Leading segments alone all map to the root
    registry.get_or_create(&id("app"));
    registry.get_or_create(&id("other"));
    assert_eq!(registry.storage_aliases(&id("third")), vec![id("app"), id("other")]);
}

#[test]
fn test_invalid_identifier_is_rejected() {
    assert!(matches!(
        Identifier::parse("app..users"),
        Err(DocstoreError::InvalidIdentifier { .. })
    ));
    assert!(matches!(
        "app.us$ers".parse::<Identifier>(),
        Err(DocstoreError::InvalidIdentifier { .. })
    ));
}

#[tokio::test]
async fn test_state_loaded_once() {
    let (_tmp, registry) = file_registry();
    let doc = id("app.doc");

    let mut handle = registry.open(&doc, &json!(null)).await.unwrap();
    handle.set_data(json!("saved")).unwrap();
    handle.save_and_close().await.unwrap();

    // Overwriting the file behind the registry's back is not picked up
    let path = registry.store().primary_path(&doc);
    std::fs::write(&path, br#""edited on disk""#).unwrap();

    let mut handle = registry.open(&doc, &json!(null)).await.unwrap();
    assert_eq!(*handle.data().unwrap(), json!("saved"));
    handle.close().unwrap();
    assert_eq!(registry.store().load(&doc), Some(json!("edited on disk")));
}

// --------------------------------------------------------------------
// Scoped access
//

#[tokio::test]
async fn test_with_database_saves_and_releases() {
    let registry = mem_registry();
    let doc = id("app.visits");

    for _ in 0..3 {
        let count = registry
            .with_database(&doc, &json!(0), |db| {
                async move {
                    let count = db.data()?;
                    *count = json!(count.as_i64().unwrap_or(0) + 1);
                    Ok::<_, DocstoreError>(count.as_i64())
                }
                .boxed()
            })
            .await
            .unwrap();
        assert!(count.is_some());
    }

    assert_eq!(registry.store().load(&doc), Some(json!(3)));
    assert!(registry.get(&doc).unwrap().access_queue().is_idle());
}

#[derive(Debug)]
enum AppError {
    Store(DocstoreError),
    Rejected,
}

impl From<DocstoreError> for AppError {
    fn from(e: DocstoreError) -> Self {
        Self::Store(e)
    }
}

#[tokio::test]
async fn test_with_database_releases_on_error() {
    let registry = mem_registry();
    let doc = id("app.orders");

    let result: Result<(), AppError> = registry
        .with_database(&doc, &json!([]), |db| {
            async move {
                db.data()?.as_array_mut().unwrap().push(json!("partial"));
                Err(AppError::Rejected)
            }
            .boxed()
        })
        .await;
    assert!(matches!(result, Err(AppError::Rejected)));

    // Flushed and released anyway
    assert_eq!(registry.store().load(&doc), Some(json!(["partial"])));
    let mut next = registry.handle(&doc, &json!([]));
    next.open().now_or_never().expect("lock leaked").unwrap();
    next.close().unwrap();
}

#[tokio::test]
async fn test_with_database_releases_on_panic() {
    let registry = Arc::new(mem_registry());
    let doc = id("app.fragile");

    let task = {
        let registry = Arc::clone(&registry);
        let doc = doc.clone();
        tokio::spawn(async move {
            registry
                .with_database(&doc, &json!({"ok": true}), |db| {
                    async move {
                        db.data()?["touched"] = json!(true);
                        if db.data()?["ok"] == json!(true) {
                            panic!("caller bug");
                        }
                        Ok::<_, DocstoreError>(())
                    }
                    .boxed()
                })
                .await
        })
    };
    let joined = task.await;
    assert!(joined.unwrap_err().is_panic());

    assert_eq!(
        registry.store().load(&doc),
        Some(json!({"ok": true, "touched": true}))
    );
    let mut next = registry.handle(&doc, &json!(null));
    next.open().now_or_never().expect("lock leaked").unwrap();
    next.close().unwrap();
}

#[tokio::test]
async fn test_with_database_after_manual_close() {
    let registry = mem_registry();
    let doc = id("app.manual");

    let state = registry
        .with_database(&doc, &json!(1), |db| {
            async move {
                db.save_and_close().await?;
                Ok::<_, DocstoreError>(db.state())
            }
            .boxed()
        })
        .await
        .unwrap();
    assert_eq!(state, HandleState::Closed);
    assert_eq!(registry.store().load(&doc), Some(json!(1)));
}

// --------------------------------------------------------------------
// Global registry
//

#[tokio::test]
async fn test_global_registry_configured_once() {
    let tmp = tempfile::TempDir::new().unwrap();
    let registry = Registry::install_global(StoreConfig::new(tmp.path())).unwrap();
    assert_eq!(registry.store().root(), tmp.path());
    assert!(std::ptr::eq(registry, Registry::global()));

    assert!(matches!(
        Registry::install_global(StoreConfig::default()),
        Err(DocstoreError::AlreadyConfigured)
    ));

    let doc = id("app.global");
    let mut handle = Registry::global().open(&doc, &json!("g")).await.unwrap();
    handle.save_and_close().await.unwrap();
    assert!(tmp.path().join("global").join("data.json").exists());
}
