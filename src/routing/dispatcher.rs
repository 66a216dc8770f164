//! Route table and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Find the first route matching a request's method and path
//! - Populate path parameters and invoke the route's handler
//! - Fail with an explicit route-not-found error otherwise
//!
//! # Design Decisions
//! - First registered, first matched: no specificity reordering
//! - The table lives behind `ArcSwap`; dispatch works on a snapshot, so a
//!   concurrent `reset` never pulls a route out from under an in-flight request
//! - O(n) scan per request (acceptable for typical route counts)

use arc_swap::ArcSwap;
use axum::http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ConfigError, DispatchError};
use crate::http::{Conn, Method};
use crate::routing::pattern::PathPattern;
use crate::routing::pipeline::BoxStep;

/// One registered route. Immutable once created.
pub struct Route {
    method: Method,
    matcher: PathPattern,
    handler: BoxStep<Conn>,
}

impl Route {
    pub fn method(&self) -> Method {
        self.method
    }

    /// The normalized pattern the route was registered with.
    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn param_names(&self) -> &[String] {
        self.matcher.params()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.matcher.as_str())
            .field("params", &self.matcher.params())
            .finish()
    }
}

/// Ordered route table.
pub struct Dispatcher {
    routes: ArcSwap<Vec<Arc<Route>>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.load().len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register `handler` for `method` + `path`. The handler is expected to
    /// already include its scope's pipelines.
    pub fn add(
        &self,
        method: Method,
        path: &str,
        handler: BoxStep<Conn>,
    ) -> Result<(), ConfigError> {
        let matcher = PathPattern::compile(path)?;
        tracing::debug!(method = %method, pattern = %matcher.as_str(), "registering route");

        let route = Arc::new(Route {
            method,
            matcher,
            handler,
        });
        self.routes.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(route.clone());
            next
        });
        Ok(())
    }

    /// Snapshot of the route table.
    pub fn routes(&self) -> Arc<Vec<Arc<Route>>> {
        self.routes.load_full()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }

    /// Match `conn` against the table, fill in its path parameters and hand
    /// back the first matching route's handler without running it.
    pub fn lookup(&self, mut conn: Conn) -> Result<(BoxStep<Conn>, Conn), DispatchError> {
        let found = {
            let routes = self.routes.load();
            routes.iter().find_map(|route| {
                if route.method != conn.method() {
                    return None;
                }
                route
                    .matcher
                    .captures(conn.path())
                    .map(|values| (route.clone(), values))
            })
        };

        let Some((route, values)) = found else {
            tracing::debug!(method = %conn.method(), path = %conn.path(), "no route matched");
            conn.status(StatusCode::NOT_FOUND);
            return Err(DispatchError::RouteNotFound {
                method: conn.method().to_string(),
                path: conn.path().to_string(),
            });
        };

        tracing::trace!(pattern = %route.pattern(), path = %conn.path(), "route matched");
        let path_params: HashMap<String, String> = route
            .matcher
            .params()
            .iter()
            .cloned()
            .zip(values)
            .collect();
        conn.assign_path_params(path_params);

        Ok((route.handler.clone(), conn))
    }

    /// Match `conn` against the table and run the first matching handler.
    pub async fn dispatch(&self, conn: Conn) -> Result<Conn, DispatchError> {
        let (handler, conn) = self.lookup(conn)?;
        handler.call(conn).await
    }

    /// Drop every route.
    pub fn reset(&self) {
        self.routes.store(Arc::new(Vec::new()));
    }
}
