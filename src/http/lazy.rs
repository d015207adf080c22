//! Lazy-module connection endpoint.
//!
//! # Responsibilities
//! - Parse the requested key batch from the raw request path
//! - Activate every key and hold the references for the connection's lifetime
//! - Answer with a persistent, unbuffered event stream
//! - Ask the host to rebuild when a module was not active before
//!
//! # Design Decisions
//! - The raw path is used, not the `Path` extractor, so escapes in keys are
//!   canonicalized by the codec and nothing else
//! - A malformed batch is rejected before any key is touched
//! - Once the backend is torn down, new connections are refused with 503

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};

use crate::activation::ActivationRegistry;
use crate::codec::decode_batch;
use crate::host::Compiler;
use crate::http::stream::event_stream;
use crate::lifecycle::Shutdown;
use crate::net::{ConnectionLease, ConnectionTracker};
use crate::observability::metrics;

/// Shared state of the lazy endpoint.
#[derive(Clone)]
pub struct LazyEndpoint {
    pub registry: Arc<ActivationRegistry>,
    pub compiler: Arc<dyn Compiler>,
    pub connections: ConnectionTracker,
    pub shutdown: Shutdown,
    pub heartbeat: Option<Duration>,
}

impl LazyEndpoint {
    /// Router serving every path below the mount point.
    pub fn router(self) -> Router {
        Router::new()
            .route("/", any(open_connection))
            .route("/{*keys}", any(open_connection))
            .with_state(self)
    }
}

/// Handle one client connection requesting a batch of modules.
async fn open_connection(State(endpoint): State<LazyEndpoint>, request: Request) -> Response {
    if endpoint.shutdown.is_triggered() {
        tracing::debug!(path = %request.uri().path(), "Refusing lazy connection after teardown");
        return (StatusCode::SERVICE_UNAVAILABLE, "lazy compilation is shut down").into_response();
    }

    let path = request.uri().path();
    let keys = match decode_batch(path) {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Rejecting malformed lazy module request");
            metrics::record_rejected_batch();
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let lease = ConnectionLease::open(
        Arc::clone(&endpoint.registry),
        &endpoint.connections,
        keys,
    );

    if lease.newly_activated() {
        tracing::debug!(connection_id = %lease.id(), "Invalidating build for newly used modules");
        metrics::record_invalidation();
        endpoint.compiler.invalidate();
    }

    let body = event_stream(lease, endpoint.shutdown.clone(), endpoint.heartbeat);
    stream_response(body)
}

fn stream_response(body: Body) -> Response {
    let wildcard = HeaderValue::from_static("*");
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, wildcard.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, wildcard.clone());
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, wildcard);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ModuleStatus;
    use crate::codec::ModuleKey;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct CountingCompiler {
        invalidations: AtomicUsize,
    }

    impl Compiler for CountingCompiler {
        fn context(&self) -> &Path {
            Path::new("/app")
        }

        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn endpoint() -> (LazyEndpoint, Arc<CountingCompiler>) {
        let compiler = Arc::new(CountingCompiler::default());
        let endpoint = LazyEndpoint {
            registry: ActivationRegistry::new(Duration::from_secs(60)),
            compiler: compiler.clone(),
            connections: ConnectionTracker::new(),
            shutdown: Shutdown::new(),
            heartbeat: None,
        };
        (endpoint, compiler)
    }

    fn get(uri: &str) -> Request {
        axum::http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_activates_batch_and_invalidates_once() {
        let (endpoint, compiler) = endpoint();
        let registry = endpoint.registry.clone();

        let response = endpoint
            .router()
            .oneshot(get("/src/a.js@src/b.js"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS], "*");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");

        let a = ModuleKey::encode("src/a.js");
        let b = ModuleKey::encode("src/b.js");
        assert_eq!(registry.status(&a), Some(ModuleStatus::Used { ref_count: 1 }));
        assert_eq!(registry.status(&b), Some(ModuleStatus::Used { ref_count: 1 }));
        assert_eq!(compiler.invalidations.load(Ordering::SeqCst), 1);

        drop(response);
        assert_eq!(registry.status(&a), Some(ModuleStatus::Unused));
        assert_eq!(registry.status(&b), Some(ModuleStatus::Unused));
    }

    #[tokio::test]
    async fn test_already_active_modules_do_not_invalidate() {
        let (endpoint, compiler) = endpoint();
        let router = endpoint.clone().router();

        let first = router.clone().oneshot(get("/src/a.js")).await.unwrap();
        let second = router.oneshot(get("/src/a.js@src/a.js")).await.unwrap();

        let a = ModuleKey::encode("src/a.js");
        assert_eq!(
            endpoint.registry.status(&a),
            Some(ModuleStatus::Used { ref_count: 3 })
        );
        assert_eq!(compiler.invalidations.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.connections.active_count(), 2);

        drop(second);
        assert_eq!(
            endpoint.registry.status(&a),
            Some(ModuleStatus::Used { ref_count: 1 })
        );
        drop(first);
        assert_eq!(endpoint.registry.status(&a), Some(ModuleStatus::Unused));
    }

    #[tokio::test]
    async fn test_malformed_batch_is_rejected_without_side_effects() {
        let (endpoint, compiler) = endpoint();
        let registry = endpoint.registry.clone();

        let response = endpoint
            .router()
            .oneshot(get("/src/a.js@@src/b.js"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(registry.is_empty());
        assert_eq!(compiler.invalidations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_connection_after_teardown_is_refused() {
        let (endpoint, compiler) = endpoint();
        let registry = endpoint.registry.clone();
        let router = endpoint.clone().router();

        endpoint.shutdown.trigger();
        registry.clear();

        let response = router.oneshot(get("/src/a.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(registry.is_empty());
        assert_eq!(compiler.invalidations.load(Ordering::SeqCst), 0);
        assert_eq!(endpoint.connections.active_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let (endpoint, _) = endpoint();
        let response = endpoint.router().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
