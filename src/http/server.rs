//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum Router dispatching through the middleware stack
//! - Fall back to the host's own router, then 404
//! - Disable Nagle on every accepted socket so stream flushes go out at once
//! - Bind server to listener and drain on shutdown

use axum::{
    extract::{Request, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    serve::ListenerExt,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

use crate::http::middleware::MiddlewareStack;
use crate::lifecycle::Shutdown;

#[derive(Clone)]
struct DispatchState {
    stack: MiddlewareStack,
    fallback: Option<Router>,
}

/// Dev server fronting the host's middleware chain.
pub struct DevServer {
    router: Router,
}

impl DevServer {
    /// Server dispatching through `stack` only.
    pub fn new(stack: MiddlewareStack) -> Self {
        Self::build(stack, None)
    }

    /// Server dispatching through `stack`, then `fallback` for unmatched paths.
    pub fn with_fallback(stack: MiddlewareStack, fallback: Router) -> Self {
        Self::build(stack, Some(fallback))
    }

    fn build(stack: MiddlewareStack, fallback: Option<Router>) -> Self {
        let router = Router::new()
            .fallback(dispatch)
            .with_state(DispatchState { stack, fallback })
            .layer(TraceLayer::new_for_http());
        Self { router }
    }

    /// The assembled router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain open connections.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Dev server starting");

        let listener = listener.tap_io(|tcp| {
            if let Err(e) = tcp.set_nodelay(true) {
                tracing::warn!(error = %e, "Failed to set TCP_NODELAY");
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("Dev server stopped");
        Ok(())
    }
}

/// Route a request to the first middleware mounted above its path.
async fn dispatch(State(state): State<DispatchState>, mut request: Request) -> Response {
    let Some((middleware, rest)) = state.stack.resolve(request.uri().path()) else {
        return match state.fallback {
            Some(fallback) => call(fallback, request).await,
            None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        };
    };

    match rewrite_path(request.uri(), &rest) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to rewrite request path");
            return (StatusCode::BAD_REQUEST, "Invalid request path").into_response();
        }
    }

    tracing::trace!(middleware = %middleware.name, path = %rest, "Dispatching to middleware");
    call(middleware.service.clone(), request).await
}

async fn call(router: Router, request: Request) -> Response {
    match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Replace the path of `uri`, keeping its query.
fn rewrite_path(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    Uri::builder().path_and_query(path_and_query).build()
}
