//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use refl::config::Settings;
use refl::{step, App, BoxStep, Conn, HttpServer, Method, Shutdown};

pub fn mock(method: Method, url: &str) -> Conn {
    Conn::mock(method, url).unwrap()
}

/// Step that appends `tag` to the `trail` array in the Conn store.
pub fn trail(tag: &'static str) -> BoxStep<Conn> {
    step(move |mut conn: Conn| async move {
        let mut items = conn
            .get("trail")
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default();
        items.push(tag.into());
        conn.set("trail", items);
        Ok(conn)
    })
}

/// Step applying `f` to the integer stored under `n` (0 when absent).
pub fn arith(f: fn(i64) -> i64) -> BoxStep<Conn> {
    step(move |mut conn: Conn| async move {
        let n = conn.get("n").and_then(|value| value.as_i64()).unwrap_or(0);
        conn.set("n", f(n));
        Ok(conn)
    })
}

pub fn trail_of(conn: &Conn) -> Vec<String> {
    conn.get("trail")
        .and_then(|value| value.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Serve `app` on an ephemeral local port. Dropping or triggering the
/// returned `Shutdown` stops the server.
pub async fn spawn_server(server: HttpServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown)
}

pub fn server(app: App, settings: Settings) -> HttpServer {
    HttpServer::new(Arc::new(app), settings)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
