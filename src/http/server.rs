//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router whose fallback feeds every request to the app
//! - Wire up middleware (request ID, tracing, timeout)
//! - Reload routes before each request in development mode
//! - Bind server to listener and shut down gracefully
//! - Observability (metrics, correlation IDs)
//!
//! # Design Decisions
//! - In reload mode a reload holds the lock exclusively, while a request
//!   holds it shared only for its route lookup; handlers run unlocked on the
//!   `Arc` they were matched to, so a slow handler never stalls a reload

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::App;
use crate::config::Settings;
use crate::error::ConfigError;
use crate::http::conn::{Conn, ConnError};
use crate::http::query::QueryMode;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Re-registers an application's pipelines and routes.
pub type ReloadHook = Arc<dyn Fn(&App) -> Result<(), ConfigError> + Send + Sync>;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<App>,
    pub query_mode: QueryMode,
    pub reload: Option<ReloadHook>,
    /// Reloads hold it exclusively, dispatches shared.
    pub reload_lock: Arc<RwLock<()>>,
}

/// HTTP server in front of an [`App`].
pub struct HttpServer {
    app: Arc<App>,
    settings: Settings,
    reload: Option<ReloadHook>,
}

impl HttpServer {
    pub fn new(app: Arc<App>, settings: Settings) -> Self {
        Self {
            app,
            settings,
            reload: None,
        }
    }

    /// Hook replayed before each request when `server.reload_routes` is on.
    pub fn with_reload<F>(mut self, configure: F) -> Self
    where
        F: Fn(&App) -> Result<(), ConfigError> + Send + Sync + 'static,
    {
        self.reload = Some(Arc::new(configure));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn into_router(self) -> Router {
        let reload = if self.settings.server.reload_routes {
            if self.reload.is_none() {
                tracing::warn!("reload_routes enabled but no reload hook installed");
            }
            self.reload
        } else {
            None
        };

        let state = AppState {
            app: self.app,
            query_mode: self.settings.routing.query_mode,
            reload,
            reload_lock: Arc::new(RwLock::new(())),
        };

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.settings.server.request_timeout_secs,
            )))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = request_id(request.headers()).unwrap_or("-"),
                )
            }))
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            app = %self.app.name(),
            reload_routes = self.settings.server.reload_routes,
            "HTTP server starting"
        );

        let router = self.into_router();
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the app's router.
async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();
    let method = parts.method.to_string();

    let response = match Conn::build(parts, state.query_mode) {
        Ok(conn) => dispatch(&state, conn).await,
        Err(ConnError::Method(e)) => {
            (StatusCode::METHOD_NOT_ALLOWED, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

async fn dispatch(state: &AppState, conn: Conn) -> Response {
    let router = state.app.router();

    let result = match &state.reload {
        Some(reload) => {
            {
                let _guard = state.reload_lock.write().await;
                if let Err(e) = state.app.reload(|app| reload(app)) {
                    tracing::error!(error = %e, "route reload failed");
                    return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
                }
                metrics::record_reload();
            }
            let matched = {
                let _guard = state.reload_lock.read().await;
                router.lookup(conn)
            };
            match matched {
                Ok((handler, conn)) => handler.call(conn).await,
                Err(e) => Err(e),
            }
        }
        None => router.dispatch(conn).await,
    };

    match result {
        Ok(conn) => conn.into_response(),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                tracing::error!(status = %status, error = %e, "request failed");
            } else if status == StatusCode::NOT_FOUND {
                tracing::warn!(error = %e, "not found");
            } else {
                tracing::debug!(status = %status, error = %e, "request failed");
            }
            e.into_response()
        }
    }
}
