//! What a route points at: a handler, or an action string resolved against
//! the application's controllers.

use std::future::Future;

use crate::error::DispatchError;
use crate::http::Conn;
use crate::routing::pipeline::{step, BoxStep};

/// A route target before resolution.
pub enum Target {
    Handler(BoxStep<Conn>),
    /// `"Controller@method"` or `"Controller#method"`.
    Action(String),
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Handler(_) => f.write_str("Target::Handler(..)"),
            Target::Action(key) => f.debug_tuple("Target::Action").field(key).finish(),
        }
    }
}

/// Conversion into a [`Target`].
///
/// The `M` parameter only keeps the closure and string impls apart.
pub trait IntoTarget<M> {
    fn into_target(self) -> Target;
}

#[doc(hidden)]
pub struct ViaFn;
#[doc(hidden)]
pub struct ViaStep;
#[doc(hidden)]
pub struct ViaAction;
#[doc(hidden)]
pub struct ViaTarget;

impl<F, Fut> IntoTarget<ViaFn> for F
where
    F: Fn(Conn) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Conn, DispatchError>> + Send + 'static,
{
    fn into_target(self) -> Target {
        Target::Handler(step(self))
    }
}

impl IntoTarget<ViaStep> for BoxStep<Conn> {
    fn into_target(self) -> Target {
        Target::Handler(self)
    }
}

impl IntoTarget<ViaAction> for &str {
    fn into_target(self) -> Target {
        Target::Action(self.to_string())
    }
}

impl IntoTarget<ViaAction> for String {
    fn into_target(self) -> Target {
        Target::Action(self)
    }
}

impl IntoTarget<ViaTarget> for Target {
    fn into_target(self) -> Target {
        self
    }
}
