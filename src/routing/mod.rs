//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup or reload):
//!     router.pipeline(name, steps)      → named Pipeline
//!     router.scope(|scope| ...)
//!         → scope.set_prefix / pipe_through / nest
//!         → scope.get(path, target)
//!             → target resolved (handler or Controller@action)
//!             → Pipeline::wrap(scope pipelines, handler)
//!             → dispatcher.add(method, prefix + path)
//!
//! Dispatch (per request):
//!     Conn
//!     → dispatcher.rs (first route whose method and pattern match)
//!     → path params merged into conn.params
//!     → wrapped handler: pipelines in scope order, then handler
//!     → Ok(Conn) | Err(DispatchError)
//! ```
//!
//! # Design Decisions
//! - First registered route wins; no specificity sorting
//! - No regex in the hot path (segment comparison only)
//! - Everything is resolved at registration time; dispatch never looks up
//!   pipelines or controllers by name

pub mod dispatcher;
pub mod pattern;
pub mod pipeline;
pub mod resources;
pub mod router;
pub mod scope;
pub mod target;

pub use dispatcher::{Dispatcher, Route};
pub use pattern::PathPattern;
pub use pipeline::{step, BoxStep, Pipeline, Step};
pub use resources::{ResourceAction, ResourceOptions};
pub use router::Router;
pub use scope::{PipeRef, Scope};
pub use target::{IntoTarget, Target};
