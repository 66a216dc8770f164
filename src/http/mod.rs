//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → conn.rs (request head + decoded query → Conn)
//!     → [routing layer dispatches the Conn]
//!     → response.rs (Conn or DispatchError → HTTP response)
//!     → Send to client
//! ```

pub mod conn;
pub mod method;
pub mod query;
pub mod request;
pub mod response;
pub mod server;

pub use conn::{Conn, ConnError};
pub use method::{Method, UnsupportedMethod};
pub use query::{ParamValue, Params, QueryMode};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ReloadHook};
