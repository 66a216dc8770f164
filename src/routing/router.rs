//! Top-level routing façade.
//!
//! # Responsibilities
//! - Own the named-pipeline registry and the dispatcher
//! - Hand out root scopes for route registration
//! - Resolve route targets (handlers or action strings)
//! - Reset everything for a development-time reload
//!
//! # Design Decisions
//! - All methods take `&self`; registries use interior mutability so scopes
//!   can borrow the router while registering
//! - Pipeline names are unique at any point in time
//! - `reset` keeps the instance alive so existing references stay valid

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

use crate::app::ControllerRegistry;
use crate::error::{ConfigError, DispatchError};
use crate::http::Conn;
use crate::routing::dispatcher::Dispatcher;
use crate::routing::pipeline::{BoxStep, Pipeline};
use crate::routing::scope::Scope;
use crate::routing::target::Target;

pub struct Router {
    pipelines: DashMap<String, Arc<Pipeline<Conn>>>,
    dispatcher: Dispatcher,
    controllers: Option<Arc<ControllerRegistry>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("pipelines", &self.pipeline_names())
            .field("dispatcher", &self.dispatcher)
            .field("controllers", &self.controllers.is_some())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// A router without controllers; action strings cannot be resolved.
    pub fn new() -> Self {
        Self {
            pipelines: DashMap::new(),
            dispatcher: Dispatcher::new(),
            controllers: None,
        }
    }

    /// A router resolving action strings against `controllers`.
    pub fn with_controllers(controllers: Arc<ControllerRegistry>) -> Self {
        Self {
            controllers: Some(controllers),
            ..Self::new()
        }
    }

    pub fn controllers(&self) -> Option<&Arc<ControllerRegistry>> {
        self.controllers.as_ref()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Register a named pipeline.
    pub fn pipeline(
        &self,
        name: impl Into<String>,
        steps: Vec<BoxStep<Conn>>,
    ) -> Result<Arc<Pipeline<Conn>>, ConfigError> {
        let pipeline = Pipeline::new(name, steps)?;
        self.insert_pipeline(pipeline)
    }

    /// Register steps under a generated unique name and return that name.
    pub(crate) fn anonymous_pipeline(
        &self,
        steps: Vec<BoxStep<Conn>>,
    ) -> Result<String, ConfigError> {
        let pipeline = self.insert_pipeline(Pipeline::anonymous(steps))?;
        Ok(pipeline.name().to_string())
    }

    fn insert_pipeline(
        &self,
        pipeline: Pipeline<Conn>,
    ) -> Result<Arc<Pipeline<Conn>>, ConfigError> {
        match self.pipelines.entry(pipeline.name().to_string()) {
            Entry::Occupied(entry) => Err(ConfigError::DuplicatePipeline(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    pipeline = %pipeline.name(),
                    steps = pipeline.len(),
                    "registering pipeline"
                );
                let pipeline = Arc::new(pipeline);
                entry.insert(pipeline.clone());
                Ok(pipeline)
            }
        }
    }

    /// Look up a registered pipeline.
    pub fn get_pipeline(&self, name: &str) -> Option<Arc<Pipeline<Conn>>> {
        self.pipelines.get(name).map(|entry| entry.value().clone())
    }

    pub fn has_pipeline(&self, name: &str) -> bool {
        self.pipelines.contains_key(name)
    }

    /// Registered pipeline names, sorted.
    pub fn pipeline_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .pipelines
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Create a root scope and configure it with `f`.
    pub fn scope<F>(&self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<(), ConfigError>,
    {
        let mut scope = Scope::new(self);
        f(&mut scope)
    }

    /// Turn a route target into a handler.
    pub(crate) fn resolve_target(&self, target: Target) -> Result<BoxStep<Conn>, ConfigError> {
        match target {
            Target::Handler(handler) => Ok(handler),
            Target::Action(key) if key.trim().is_empty() => Err(ConfigError::InvalidHandler),
            Target::Action(key) => match &self.controllers {
                Some(controllers) => controllers.resolve(&key),
                None => Err(ConfigError::NoApplication(key)),
            },
        }
    }

    /// Match without running; see [`Dispatcher::lookup`].
    pub fn lookup(&self, conn: Conn) -> Result<(BoxStep<Conn>, Conn), DispatchError> {
        self.dispatcher.lookup(conn)
    }

    pub async fn dispatch(&self, conn: Conn) -> Result<Conn, DispatchError> {
        self.dispatcher.dispatch(conn).await
    }

    /// Drop every pipeline and route. Controllers are left alone.
    pub fn reset(&self) {
        self.dispatcher.reset();
        self.pipelines.clear();
    }
}
