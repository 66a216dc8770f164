//! Controllers and the action lookup table.
//!
//! # Responsibilities
//! - Group named handlers ("actions") under a controller name
//! - Resolve `Controller@method` / `Controller#method` keys at registration time
//!
//! # Design Decisions
//! - Controllers are immutable once built; re-registering a name replaces it
//! - Resolution failures are configuration errors, never runtime 404s

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{ConfigError, DispatchError};
use crate::http::Conn;
use crate::routing::pipeline::{step, BoxStep};

/// A named set of actions.
pub struct Controller {
    name: String,
    actions: HashMap<String, BoxStep<Conn>>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("actions", &actions)
            .finish()
    }
}

impl Controller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: HashMap::new(),
        }
    }

    /// Add an action.
    pub fn action<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Conn) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Conn, DispatchError>> + Send + 'static,
    {
        self.actions.insert(name.into(), step(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn handler(&self, name: &str) -> Option<BoxStep<Conn>> {
        self.actions.get(name).cloned()
    }
}

/// Split an action key at its single `@` or `#`.
pub fn parse_action_key(key: &str) -> Result<(&str, &str), ConfigError> {
    let mut parts = key.split(['@', '#']);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(controller), Some(action), None) if !controller.is_empty() && !action.is_empty() => {
            Ok((controller, action))
        }
        _ => Err(ConfigError::InvalidActionKey(key.to_string())),
    }
}

/// Name → controller table shared between an application and its router.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: DashMap<String, Arc<Controller>>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.controllers.len())
            .finish()
    }
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, controller: Controller) -> Arc<Controller> {
        let controller = Arc::new(controller);
        tracing::debug!(controller = %controller.name(), "registering controller");
        self.controllers
            .insert(controller.name().to_string(), controller.clone());
        controller
    }

    pub fn get(&self, name: &str) -> Option<Arc<Controller>> {
        self.controllers.get(name).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Resolve `Controller@method` to its handler.
    pub fn resolve(&self, key: &str) -> Result<BoxStep<Conn>, ConfigError> {
        let (controller_name, action) = parse_action_key(key)?;
        let controller = self
            .get(controller_name)
            .ok_or_else(|| ConfigError::ControllerNotFound(controller_name.to_string()))?;
        controller
            .handler(action)
            .ok_or_else(|| ConfigError::ActionNotFound {
                controller: controller_name.to_string(),
                action: action.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Controller {
        Controller::new("PagesController")
            .action("home", |mut conn: Conn| async move {
                conn.set("hello", "world");
                Ok(conn)
            })
    }

    #[test]
    fn test_parse_action_key() {
        assert_eq!(parse_action_key("PostsController@index"), Ok(("PostsController", "index")));
        assert_eq!(parse_action_key("PostsController#show"), Ok(("PostsController", "show")));
        for bad in ["PostsController", "A@b@c", "A@b#c", "@index", "Posts@", ""] {
            assert_eq!(
                parse_action_key(bad),
                Err(ConfigError::InvalidActionKey(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_resolve() {
        let registry = ControllerRegistry::new();
        registry.register(pages());

        assert!(registry.resolve("PagesController@home").is_ok());
        assert!(registry.resolve("PagesController#home").is_ok());
        assert!(matches!(
            registry.resolve("MissingController@home"),
            Err(ConfigError::ControllerNotFound(name)) if name == "MissingController"
        ));
        assert!(matches!(
            registry.resolve("PagesController@about"),
            Err(ConfigError::ActionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolved_handler_runs() {
        let registry = ControllerRegistry::new();
        registry.register(pages());

        let handler = registry.resolve("PagesController@home").unwrap();
        let conn = handler
            .call(Conn::mock(crate::http::Method::Get, "/home").unwrap())
            .await
            .unwrap();
        assert_eq!(conn.get("hello"), Some(&serde_json::Value::from("world")));
    }

    #[test]
    fn test_register_replaces() {
        let registry = ControllerRegistry::new();
        registry.register(pages());
        registry.register(Controller::new("PagesController"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.get("PagesController").unwrap().has_action("home"));
    }
}
