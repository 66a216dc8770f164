//! Refl: HTTP routing and middleware engine.
//!
//! Requests become a [`Conn`], flow through named pipelines of asynchronous
//! steps, and reach a handler picked by a first-match dispatcher. Routes are
//! declared through nestable scopes that carry a path prefix and a pipeline
//! chain.

// Core subsystems
pub mod app;
pub mod http;
pub mod routing;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use app::{App, Controller};
pub use config::Settings;
pub use error::{ConfigError, DispatchError};
pub use http::{Conn, HttpServer, Method};
pub use lifecycle::Shutdown;
pub use routing::{step, BoxStep, Pipeline, ResourceAction, ResourceOptions, Router, Scope};
