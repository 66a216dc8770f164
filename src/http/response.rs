//! Turning dispatch outcomes into HTTP responses.
//!
//! # Responsibilities
//! - Write a finished `Conn`'s status, headers and body
//! - Map a `DispatchError` to its status with the message as text body
//!
//! # Design Decisions
//! - Headers set by handlers override defaults (e.g. `content-type`)
//! - A `Conn` without a body produces an empty response body

use axum::response::{IntoResponse, Response};

use crate::error::DispatchError;
use crate::http::Conn;

impl IntoResponse for Conn {
    fn into_response(self) -> Response {
        let (status, headers, body) = self.into_response_parts();
        let mut response = match body {
            Some(body) => (status, body).into_response(),
            None => status.into_response(),
        };
        response.headers_mut().extend(headers);
        response
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
