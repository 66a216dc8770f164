//! Application: the composition root tying a router to its controllers.
//!
//! # Data Flow
//! ```text
//! configure(&App)  (at startup, and again on every reload)
//!     → app.controller(...)      registers controllers
//!     → app.router().pipeline()  registers named pipelines
//!     → app.router().scope()     registers routes (actions resolved here)
//!
//! reload(configure)
//!     → router.reset()           pipelines + routes dropped, controllers kept
//!     → configure(&App)          replayed against the same Router instance
//! ```

pub mod controller;

use std::sync::Arc;

pub use controller::{Controller, ControllerRegistry};

use crate::error::ConfigError;
use crate::http::Conn;
use crate::routing::pipeline::BoxStep;
use crate::routing::Router;

/// An application: a name, its controllers and its router.
#[derive(Debug)]
pub struct App {
    name: String,
    controllers: Arc<ControllerRegistry>,
    router: Router,
}

impl App {
    pub fn new(name: impl Into<String>) -> Self {
        let controllers = Arc::new(ControllerRegistry::new());
        Self {
            name: name.into(),
            router: Router::with_controllers(controllers.clone()),
            controllers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Register (or replace) a controller.
    pub fn controller(&self, controller: Controller) -> Arc<Controller> {
        self.controllers.register(controller)
    }

    pub fn find_controller(&self, name: &str) -> Option<Arc<Controller>> {
        self.controllers.get(name)
    }

    /// Resolve an action key such as `PostsController@index`.
    pub fn action(&self, key: &str) -> Result<BoxStep<Conn>, ConfigError> {
        self.controllers.resolve(key)
    }

    /// Reset the router and replay `configure` against it.
    pub fn reload<F>(&self, configure: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&App) -> Result<(), ConfigError>,
    {
        tracing::debug!(app = %self.name, "reloading routes");
        self.router.reset();
        configure(self)
    }
}
