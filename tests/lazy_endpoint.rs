//! End-to-end tests of the lazy module endpoint over real connections.

use std::time::Duration;

use dev_lazy::activation::ModuleStatus;
use dev_lazy::host::SourceModule;
use dev_lazy::ModuleKey;

mod common;

use common::{client, wait_until, TestServer};

#[tokio::test]
async fn test_batch_activates_then_recycles() {
    let server = TestServer::start().await;
    let registry = server.lazy.registry().clone();
    let a = ModuleKey::encode("src/a.js");
    let b = ModuleKey::encode("src/b.js");

    let mut response = client()
        .get(server.url_for(&["src/a.js", "src/b.js"]))
        .send()
        .await
        .expect("server unreachable");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.chunk().await.unwrap().unwrap(), "\n");

    assert_eq!(registry.status(&a), Some(ModuleStatus::Used { ref_count: 1 }));
    assert_eq!(registry.status(&b), Some(ModuleStatus::Used { ref_count: 1 }));
    assert_eq!(server.compiler.invalidations(), 1);

    drop(response);
    wait_until("both modules are unused", || {
        registry.status(&a) == Some(ModuleStatus::Unused)
            && registry.status(&b) == Some(ModuleStatus::Unused)
    })
    .await;
    assert!(registry.is_active(&a));

    wait_until("both modules are evicted", || registry.is_empty()).await;
    assert!(!registry.is_active(&a));
    assert!(!registry.is_active(&b));
    assert_eq!(server.lazy.open_connections(), 0);
}

#[tokio::test]
async fn test_shared_module_counts_each_connection() {
    let server = TestServer::start().await;
    let registry = server.lazy.registry().clone();
    let a = ModuleKey::encode("src/a.js");
    let client = client();

    let mut first = client.get(server.url_for(&["src/a.js"])).send().await.unwrap();
    first.chunk().await.unwrap();
    let mut second = client.get(server.url_for(&["src/a.js"])).send().await.unwrap();
    second.chunk().await.unwrap();

    assert_eq!(registry.status(&a), Some(ModuleStatus::Used { ref_count: 2 }));
    assert_eq!(server.compiler.invalidations(), 1);

    drop(first);
    wait_until("one reference remains", || {
        registry.status(&a) == Some(ModuleStatus::Used { ref_count: 1 })
    })
    .await;

    drop(second);
    wait_until("the module is unused", || {
        registry.status(&a) == Some(ModuleStatus::Unused)
    })
    .await;
}

#[tokio::test]
async fn test_absolute_identifiers_keep_their_keys() {
    let server = TestServer::start().await;
    let a = SourceModule::from_path("/app/src/a.js");
    let b = SourceModule::from_path("/app/src/b.js");

    let mut response = client()
        .get(server.url_for(&["/app/src/a.js", "/app/src/b.js"]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.chunk().await.unwrap();

    assert!(server.lazy.describe(&a).await.active);
    assert!(server.lazy.describe(&b).await.active);
    assert!(!server
        .lazy
        .registry()
        .is_active(&ModuleKey::encode("app/src/a.js")));
}

#[tokio::test]
async fn test_malformed_batch_is_rejected() {
    let server = TestServer::start().await;

    let response = client()
        .get(server.url("/dev-lazy/src%2Fa.js@@src%2Fb.js"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(server.lazy.registry().is_empty());
    assert_eq!(server.compiler.invalidations(), 0);
}

#[tokio::test]
async fn test_reconnect_within_grace_period_skips_rebuild() {
    let server = TestServer::start_with(dev_lazy::LazyConfig {
        unused_timeout_ms: 60_000,
        heartbeat_ms: 50,
        ..dev_lazy::LazyConfig::default()
    })
    .await;
    let registry = server.lazy.registry().clone();
    let a = ModuleKey::encode("src/a.js");
    let client = client();

    let mut response = client.get(server.url_for(&["src/a.js"])).send().await.unwrap();
    response.chunk().await.unwrap();
    drop(response);
    wait_until("the module is unused", || {
        registry.status(&a) == Some(ModuleStatus::Unused)
    })
    .await;

    let mut response = client.get(server.url_for(&["src/a.js"])).send().await.unwrap();
    response.chunk().await.unwrap();

    assert_eq!(registry.status(&a), Some(ModuleStatus::Used { ref_count: 1 }));
    assert_eq!(server.compiler.invalidations(), 1);
}

#[tokio::test]
async fn test_describe_follows_connections() {
    let server = TestServer::start().await;
    let module = SourceModule::new("src/a.js", None);

    let info = server.lazy.describe(&module).await;
    assert!(!info.active);
    assert_eq!(info.data, ModuleKey::encode("src/a.js"));

    let mut response = client()
        .get(server.url_for(&["src/a.js"]))
        .send()
        .await
        .unwrap();
    response.chunk().await.unwrap();

    assert!(server.lazy.describe(&module).await.active);
}

#[tokio::test]
async fn test_teardown_closes_streams_and_unmounts() {
    let server = TestServer::start().await;
    let client = client();

    let mut response = client.get(server.url_for(&["src/a.js"])).send().await.unwrap();
    assert_eq!(response.chunk().await.unwrap().unwrap(), "\n");

    server.lazy.teardown().await;
    assert!(server.stack.names().is_empty());
    assert!(server.lazy.registry().is_empty());

    let end = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = response.chunk().await.unwrap() {
            assert_eq!(chunk, ":\n\n");
        }
    })
    .await;
    assert!(end.is_ok(), "stream should end after teardown");

    let response = client.get(server.url_for(&["src/a.js"])).send().await.unwrap();
    assert_eq!(response.status(), 404);
    assert!(server.lazy.registry().is_empty());
}
