//! Error taxonomy for the routing core.
//!
//! # Design Decisions
//! - Configuration errors surface synchronously from registration calls
//! - Dispatch errors travel through the pipeline as the `Err` side of a step
//! - Every dispatch error knows the HTTP status it should produce

use axum::http::StatusCode;
use thiserror::Error;

/// Errors raised while registering pipelines, routes and scopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A pipeline with the same name already exists on the router.
    #[error("pipeline already registered: {0}")]
    DuplicatePipeline(String),

    /// The pipeline could not be built (invalid name).
    #[error("invalid pipeline callbacks: {0}")]
    InvalidPipeline(String),

    /// A scope referenced a pipeline the router doesn't know.
    #[error("pipeline not found: {0}")]
    PipelineNotFound(String),

    /// Two path parameters share a name within one pattern.
    #[error("multiple params with the same name: {0}")]
    DuplicateParam(String),

    /// A `:` segment without a name, or similar malformed pattern.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),

    /// `set_prefix` called twice on the same scope.
    #[error("scope prefix already specified: {0}")]
    PrefixAlreadySet(String),

    /// The scope was created without a router.
    #[error("scope has no router to register into")]
    NoRouter,

    /// Action string used on a router with no controller registry.
    #[error("no application bound to router, cannot resolve action [{0}]")]
    NoApplication(String),

    /// Action string is not `Controller@method` / `Controller#method`.
    #[error("invalid action key [{0}]")]
    InvalidActionKey(String),

    #[error("controller [{0}] not found")]
    ControllerNotFound(String),

    #[error("action [{action}] not found in controller [{controller}]")]
    ActionNotFound { controller: String, action: String },

    /// Neither a callable handler nor a resolvable action.
    #[error("handler must be either a function or an action")]
    InvalidHandler,
}

/// Errors that abort a single request's pipeline/handler chain.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route matched the request's method and path.
    #[error("route not found: {method} {path}")]
    RouteNotFound { method: String, path: String },

    /// Raised by `Conn::not_found`.
    #[error("{0}")]
    NotFound(String),

    /// Raised by `Conn::fail`; carries the Conn status at failure time.
    #[error("{message}")]
    Halted { status: StatusCode, message: String },

    /// A value could not be serialized to JSON.
    #[error("serialization failed: {source}")]
    Serialization {
        status: StatusCode,
        source: serde_json::Error,
    },

    /// Any other error returned by a step or handler.
    #[error("{source}")]
    Other {
        status: StatusCode,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Raised outside a `Conn`, so there is no status to carry: answers 500.
impl From<serde_json::Error> for DispatchError {
    fn from(source: serde_json::Error) -> Self {
        DispatchError::Serialization {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            source,
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for DispatchError {
    fn from(source: Box<dyn std::error::Error + Send + Sync>) -> Self {
        DispatchError::Other {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            source,
        }
    }
}

impl DispatchError {
    /// HTTP status the transport adapter should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::RouteNotFound { .. } | DispatchError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DispatchError::Halted { status, .. }
            | DispatchError::Serialization { status, .. }
            | DispatchError::Other { status, .. } => *status,
        }
    }

    /// Wrap an arbitrary error with no `Conn` at hand; answers 500.
    /// Steps holding a `Conn` use [`Conn::error`](crate::http::Conn::error)
    /// to keep its status.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    /// Wrap an arbitrary error, answering with `status`.
    pub fn with_status<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DispatchError::Other {
            status,
            source: err.into(),
        }
    }

    /// True for both router-level and handler-level not-found failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::RouteNotFound { .. } | DispatchError::NotFound(_)
        )
    }
}
