//! Conventional REST routes for a controller.
//!
//! ```text
//! index    GET     /posts
//! create   GET     /posts/create
//! store    POST    /posts
//! show     GET     /posts/:id
//! edit     GET     /posts/:id/edit
//! update   PATCH   /posts/:id   (and PUT)
//! destroy  DELETE  /posts/:id
//! ```
//!
//! Nested names (`["posts", "comments"]`) put each parent's id in front:
//! `/posts/:post_id/comments/:id`.

use crate::error::ConfigError;
use crate::http::Method;
use crate::routing::scope::Scope;
use crate::routing::target::Target;

/// One conventional resource action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAction {
    Index,
    Create,
    Store,
    Show,
    Edit,
    Update,
    Destroy,
}

impl ResourceAction {
    pub const ALL: [ResourceAction; 7] = [
        ResourceAction::Index,
        ResourceAction::Create,
        ResourceAction::Store,
        ResourceAction::Show,
        ResourceAction::Edit,
        ResourceAction::Update,
        ResourceAction::Destroy,
    ];

    /// Controller action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceAction::Index => "index",
            ResourceAction::Create => "create",
            ResourceAction::Store => "store",
            ResourceAction::Show => "show",
            ResourceAction::Edit => "edit",
            ResourceAction::Update => "update",
            ResourceAction::Destroy => "destroy",
        }
    }

    fn routes(&self) -> &'static [(Method, &'static str)] {
        match self {
            ResourceAction::Index => &[(Method::Get, "")],
            ResourceAction::Create => &[(Method::Get, "/create")],
            ResourceAction::Store => &[(Method::Post, "")],
            ResourceAction::Show => &[(Method::Get, "/:id")],
            ResourceAction::Edit => &[(Method::Get, "/:id/edit")],
            ResourceAction::Update => &[(Method::Patch, "/:id"), (Method::Put, "/:id")],
            ResourceAction::Destroy => &[(Method::Delete, "/:id")],
        }
    }
}

/// Filters applied to [`Scope::resources`].
#[derive(Debug, Clone, Default)]
pub struct ResourceOptions {
    only: Option<Vec<ResourceAction>>,
    except: Vec<ResourceAction>,
}

impl ResourceOptions {
    /// Register only these actions.
    pub fn only(mut self, actions: impl IntoIterator<Item = ResourceAction>) -> Self {
        self.only = Some(actions.into_iter().collect());
        self
    }

    /// Skip these actions.
    pub fn except(mut self, actions: impl IntoIterator<Item = ResourceAction>) -> Self {
        self.except = actions.into_iter().collect();
        self
    }

    fn allows(&self, action: ResourceAction) -> bool {
        let listed = self.only.as_ref().map_or(true, |only| only.contains(&action));
        listed && !self.except.contains(&action)
    }
}

fn clean(name: &str) -> Result<&str, ConfigError> {
    let name = name.trim_matches('/');
    if name.is_empty() {
        return Err(ConfigError::InvalidPattern("empty resource name".to_string()));
    }
    Ok(name)
}

fn base_path(names: &[&str]) -> Result<String, ConfigError> {
    let Some((last, parents)) = names.split_last() else {
        return Err(ConfigError::InvalidPattern("empty resource name".to_string()));
    };

    let mut path = String::new();
    for parent in parents {
        let parent = clean(parent)?;
        let singular = parent.strip_suffix('s').unwrap_or(parent);
        path.push_str(&format!("/{parent}/:{singular}_id"));
    }
    path.push('/');
    path.push_str(clean(last)?);
    Ok(path)
}

impl<'r> Scope<'r> {
    /// Register the conventional REST routes of `controller` for `names`.
    ///
    /// Actions the controller does not define are skipped.
    pub fn resources(
        &self,
        names: &[&str],
        controller: &str,
        options: ResourceOptions,
    ) -> Result<(), ConfigError> {
        let router = self.router()?;
        let registry = router
            .controllers()
            .ok_or_else(|| ConfigError::NoApplication(controller.to_string()))?;
        let found = registry
            .get(controller)
            .ok_or_else(|| ConfigError::ControllerNotFound(controller.to_string()))?;

        let base = base_path(names)?;
        for action in ResourceAction::ALL {
            if !options.allows(action) {
                continue;
            }
            let Some(handler) = found.handler(action.as_str()) else {
                tracing::trace!(
                    controller,
                    action = action.as_str(),
                    "resource action not defined, skipping"
                );
                continue;
            };
            for (method, suffix) in action.routes() {
                self.route(*method, &format!("{base}{suffix}"), Target::Handler(handler.clone()))?;
            }
        }
        Ok(())
    }
}
