//! Refl sample server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request ID, trace, timeout)
//!                         │
//!                         ▼
//!                     http::conn  (Conn::build)
//!                         │
//!                         ▼
//!                  routing::dispatcher (first matching route)
//!                         │
//!                         ▼
//!          scope pipelines ("default") → controller action
//!                         │
//!     Client Response     ▼
//!     ◀────────────── http::response (status, headers, body)
//! ```

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use axum::http::{HeaderName, HeaderValue};
use refl::config::{load_config, Settings};
use refl::observability::{logging, metrics};
use refl::{
    step, App, ConfigError, Conn, Controller, HttpServer, ResourceAction, ResourceOptions, Shutdown,
};

#[derive(Parser)]
#[command(name = "refl")]
#[command(about = "Serve the Refl sample blog application", long_about = None)]
struct Cli {
    /// TOML settings file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Post {
    id: u64,
    title: &'static str,
    body: &'static str,
}

const POSTS: &[Post] = &[
    Post {
        id: 1,
        title: "Hello, Refl",
        body: "Pipelines, scopes and a dispatcher.",
    },
    Post {
        id: 2,
        title: "Nested scopes",
        body: "Prefixes and pipelines accumulate parent first.",
    },
];

fn posts_controller() -> Controller {
    Controller::new("PostsController")
        .action("index", |mut conn: Conn| async move {
            conn.render_json(POSTS)?;
            Ok(conn)
        })
        .action("show", |mut conn: Conn| async move {
            let id = conn.param("id").and_then(|id| id.parse::<u64>().ok());
            let Some(post) = POSTS.iter().find(|post| Some(post.id) == id) else {
                return Err(conn.not_found());
            };
            conn.render_json(post)?;
            Ok(conn)
        })
        .action("latest", |mut conn: Conn| async move {
            let latest = POSTS.iter().max_by_key(|post| post.id);
            conn.render_json(&latest)?;
            Ok(conn)
        })
}

/// Pipelines and routes of the sample application. Replayed on reload.
fn configure(app: &App) -> Result<(), ConfigError> {
    app.router().pipeline(
        "default",
        vec![step(|mut conn: Conn| async move {
            tracing::debug!(
                request_id = conn.request_id().unwrap_or("-"),
                path = %conn.path(),
                "default pipeline"
            );
            conn.resp_headers_mut().insert(
                HeaderName::from_static("x-powered-by"),
                HeaderValue::from_static("refl"),
            );
            Ok(conn)
        })],
    )?;

    app.router().scope(|scope| {
        scope.pipe_through("default")?;

        scope.get("/", |mut conn: Conn| async move {
            conn.text("Refl is running");
            Ok(conn)
        })?;
        scope.get("/home", |mut conn: Conn| async move {
            conn.text("Welcome home");
            Ok(conn)
        })?;
        scope.get("/posts/latest", "PostsController@latest")?;
        scope.resources(
            &["posts"],
            "PostsController",
            ResourceOptions::default().only([ResourceAction::Index, ResourceAction::Show]),
        )
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_config(path)?,
        None => Settings::default(),
    };
    if let Some(bind) = cli.bind {
        settings.server.bind_address = bind;
    }

    logging::init(&settings.observability.log_level);
    tracing::info!("refl v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %settings.server.bind_address,
        request_timeout_secs = settings.server.request_timeout_secs,
        query_mode = ?settings.routing.query_mode,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = App::new("Blog");
    app.controller(posts_controller());
    configure(&app)?;
    tracing::info!(routes = app.router().dispatcher().len(), "routes registered");

    let listener = TcpListener::bind(&settings.server.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(Arc::new(app), settings).with_reload(configure);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
