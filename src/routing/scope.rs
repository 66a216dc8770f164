//! Route-group builder.
//!
//! # Responsibilities
//! - Accumulate a path prefix and an ordered pipeline chain
//! - Create child scopes that snapshot the parent's prefix and pipelines
//! - Register routes wrapped in the accumulated pipelines
//!
//! # Design Decisions
//! - Children copy the parent's state at creation; later parent changes do
//!   not leak into them
//! - Pipelines are referenced by name and resolved to shared handles when a
//!   route is registered, so the route keeps working after a router reset
//! - A scope borrows its router; it cannot outlive the registration call

use std::sync::Arc;

use crate::error::ConfigError;
use crate::http::{Conn, Method};
use crate::routing::pattern::normalize;
use crate::routing::pipeline::{BoxStep, Pipeline};
use crate::routing::router::Router;
use crate::routing::target::IntoTarget;

/// Argument to [`Scope::pipe_through`].
pub enum PipeRef {
    /// A pipeline already registered on the router.
    Named(String),
    /// Steps to register as an anonymous pipeline.
    Inline(Vec<BoxStep<Conn>>),
}

impl From<&str> for PipeRef {
    fn from(name: &str) -> Self {
        PipeRef::Named(name.to_string())
    }
}

impl From<String> for PipeRef {
    fn from(name: String) -> Self {
        PipeRef::Named(name)
    }
}

impl From<Vec<BoxStep<Conn>>> for PipeRef {
    fn from(steps: Vec<BoxStep<Conn>>) -> Self {
        PipeRef::Inline(steps)
    }
}

#[derive(Debug, Clone)]
pub struct Scope<'r> {
    router: Option<&'r Router>,
    inherited_prefix: String,
    prefix: Option<String>,
    pipelines: Vec<String>,
}

impl<'r> Scope<'r> {
    /// A root scope registering into `router`.
    pub fn new(router: &'r Router) -> Self {
        Self {
            router: Some(router),
            inherited_prefix: String::new(),
            prefix: None,
            pipelines: Vec::new(),
        }
    }

    /// A scope bound to no router. It can hold a prefix but registers nothing.
    pub fn detached() -> Self {
        Self {
            router: None,
            inherited_prefix: String::new(),
            prefix: None,
            pipelines: Vec::new(),
        }
    }

    pub(crate) fn router(&self) -> Result<&'r Router, ConfigError> {
        self.router.ok_or(ConfigError::NoRouter)
    }

    /// Inherited prefix followed by this scope's own prefix.
    pub fn prefix(&self) -> String {
        match &self.prefix {
            Some(own) => format!("{}{}", self.inherited_prefix, own),
            None => self.inherited_prefix.clone(),
        }
    }

    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    /// Set this scope's prefix. Allowed once per scope.
    pub fn set_prefix(&mut self, prefix: &str) -> Result<&mut Self, ConfigError> {
        if self.prefix.is_some() {
            return Err(ConfigError::PrefixAlreadySet(prefix.to_string()));
        }
        let trimmed = prefix.trim_end_matches('/');
        self.prefix = Some(if trimmed.is_empty() {
            String::new()
        } else {
            normalize(trimmed)
        });
        Ok(self)
    }

    /// Configure a child scope. The child starts from a copy of this scope's
    /// resolved prefix and pipeline list.
    pub fn nest<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Scope<'r>) -> Result<(), ConfigError>,
    {
        let mut child = Scope {
            router: self.router,
            inherited_prefix: self.prefix(),
            prefix: None,
            pipelines: self.pipelines.clone(),
        };
        f(&mut child)
    }

    /// Alias of [`Scope::nest`].
    pub fn group<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Scope<'r>) -> Result<(), ConfigError>,
    {
        self.nest(f)
    }

    /// Append a pipeline to this scope's chain.
    pub fn pipe_through(&mut self, pipeline: impl Into<PipeRef>) -> Result<&mut Self, ConfigError> {
        let router = self.router()?;
        let name = match pipeline.into() {
            PipeRef::Named(name) => {
                if !router.has_pipeline(&name) {
                    return Err(ConfigError::PipelineNotFound(name));
                }
                name
            }
            PipeRef::Inline(steps) => router.anonymous_pipeline(steps)?,
        };
        self.pipelines.push(name);
        Ok(self)
    }

    /// Names of the pipelines routes in this scope run through, in order.
    pub fn pipes_through(&self) -> &[String] {
        &self.pipelines
    }

    /// Register `target` for `method` at `prefix() + path`.
    pub fn route<M>(
        &self,
        method: Method,
        path: &str,
        target: impl IntoTarget<M>,
    ) -> Result<(), ConfigError> {
        let router = self.router()?;
        let handler = router.resolve_target(target.into_target())?;

        let pipelines = self
            .pipelines
            .iter()
            .map(|name| {
                router
                    .get_pipeline(name)
                    .ok_or_else(|| ConfigError::PipelineNotFound(name.clone()))
            })
            .collect::<Result<Vec<Arc<Pipeline<Conn>>>, _>>()?;

        let full_path = self.join(path);
        router
            .dispatcher()
            .add(method, &full_path, Pipeline::wrap(pipelines, handler))
    }

    fn join(&self, path: &str) -> String {
        let prefix = self.prefix();
        if path.is_empty() || path == "/" {
            if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix
            }
        } else {
            format!("{}{}", prefix, normalize(path))
        }
    }

    pub fn get<M>(&self, path: &str, target: impl IntoTarget<M>) -> Result<(), ConfigError> {
        self.route(Method::Get, path, target)
    }

    pub fn post<M>(&self, path: &str, target: impl IntoTarget<M>) -> Result<(), ConfigError> {
        self.route(Method::Post, path, target)
    }

    pub fn put<M>(&self, path: &str, target: impl IntoTarget<M>) -> Result<(), ConfigError> {
        self.route(Method::Put, path, target)
    }

    pub fn patch<M>(&self, path: &str, target: impl IntoTarget<M>) -> Result<(), ConfigError> {
        self.route(Method::Patch, path, target)
    }

    pub fn delete<M>(&self, path: &str, target: impl IntoTarget<M>) -> Result<(), ConfigError> {
        self.route(Method::Delete, path, target)
    }

    pub fn head<M>(&self, path: &str, target: impl IntoTarget<M>) -> Result<(), ConfigError> {
        self.route(Method::Head, path, target)
    }
}
