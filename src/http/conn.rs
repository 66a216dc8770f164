//! Per-request context.
//!
//! # Responsibilities
//! - Carry method, path, query and path parameters through the pipeline
//! - Offer a free-form store for steps to talk to each other
//! - Hold the response status, headers and body produced by the handler
//!
//! # Design Decisions
//! - A `Conn` is owned by exactly one request and moved step to step
//! - Path parameters stay `None` until the dispatcher matches a route
//! - Failures are returned as [`DispatchError`] values, never panics

use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Request, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::error::DispatchError;
use crate::http::method::{Method, UnsupportedMethod};
use crate::http::query::{self, ParamValue, Params, QueryMode};
use crate::http::request;

/// Errors raised while turning a raw request into a [`Conn`].
#[derive(Debug, Error)]
pub enum ConnError {
    #[error(transparent)]
    Method(#[from] UnsupportedMethod),

    #[error("invalid request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("invalid status code: {0}")]
    Status(u16),
}

/// The request context handed from step to step.
#[derive(Debug)]
pub struct Conn {
    method: Method,
    path: String,
    query: Params,
    path_params: Option<HashMap<String, String>>,
    params: Params,
    assigns: HashMap<String, Value>,
    status: StatusCode,
    req: Parts,
    resp_headers: HeaderMap,
    resp_body: Option<String>,
}

impl Conn {
    /// Build a context from the request head, parsing the query with `mode`.
    pub fn build(req: Parts, mode: QueryMode) -> Result<Self, ConnError> {
        let method = Method::try_from(&req.method)?;
        let path = req.uri.path().to_string();
        let query = req
            .uri
            .query()
            .map(|q| query::decode(q, mode))
            .unwrap_or_default();

        Ok(Self {
            method,
            path,
            params: query.clone(),
            query,
            path_params: None,
            assigns: HashMap::new(),
            status: StatusCode::OK,
            req,
            resp_headers: HeaderMap::new(),
            resp_body: None,
        })
    }

    /// Build a context for `method` and `url` without a transport.
    pub fn mock(method: Method, url: &str) -> Result<Self, ConnError> {
        let (parts, ()) = Request::builder()
            .method(axum::http::Method::from(method))
            .uri(url)
            .body(())?
            .into_parts();
        Self::build(parts, QueryMode::default())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw request head this context was built from.
    pub fn req(&self) -> &Parts {
        &self.req
    }

    /// The `x-request-id` assigned by the transport, if any.
    pub fn request_id(&self) -> Option<&str> {
        request::request_id(&self.req.headers)
    }

    pub fn query(&self) -> &Params {
        &self.query
    }

    /// Parameters captured by the matched route, `None` before a match.
    pub fn path_params(&self) -> Option<&HashMap<String, String>> {
        self.path_params.as_ref()
    }

    /// Merged query + path parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Shortcut for a string-valued parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(ParamValue::as_str)
    }

    /// Store `value` under `key` for later steps.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assigns.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.assigns.get(key)
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Like [`Conn::status`] but from a raw integer in `100..=599`.
    pub fn try_status(&mut self, code: u16) -> Result<&mut Self, ConnError> {
        if !(100..=599).contains(&code) {
            return Err(ConnError::Status(code));
        }
        let status = StatusCode::from_u16(code).map_err(|_| ConnError::Status(code))?;
        Ok(self.status(status))
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Union `extra` into the params view, later keys winning.
    pub fn merge_params(&mut self, extra: Params) -> &mut Self {
        self.params.extend(extra);
        self
    }

    /// Record the matched route's parameters. They take precedence over
    /// query parameters of the same name.
    pub(crate) fn assign_path_params(&mut self, path_params: HashMap<String, String>) {
        let extra = path_params
            .iter()
            .map(|(k, v)| (k.clone(), ParamValue::Str(v.clone())))
            .collect();
        self.merge_params(extra);
        self.path_params = Some(path_params);
    }

    /// Set 404 and produce the failure that aborts the chain.
    ///
    /// ```ignore
    /// let post = find(id).ok_or_else(|| conn.not_found())?;
    /// ```
    pub fn not_found(&mut self) -> DispatchError {
        self.not_found_with("resource not found")
    }

    pub fn not_found_with(&mut self, message: impl Into<String>) -> DispatchError {
        self.status = StatusCode::NOT_FOUND;
        DispatchError::NotFound(message.into())
    }

    /// Abort the chain keeping the current status.
    pub fn fail(&self, message: impl Into<String>) -> DispatchError {
        DispatchError::Halted {
            status: self.status,
            message: message.into(),
        }
    }

    /// Abort the chain with an arbitrary error, keeping the current status.
    ///
    /// ```ignore
    /// let user = backend.fetch(id).await.map_err(|e| conn.error(e))?;
    /// ```
    pub fn error<E>(&self, err: E) -> DispatchError
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DispatchError::with_status(self.status, err)
    }

    /// Serialize `value` to a JSON string. A failure keeps the current status.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, DispatchError> {
        serde_json::to_string(value).map_err(|source| DispatchError::Serialization {
            status: self.status,
            source,
        })
    }

    /// Serialize `value` into the response body.
    pub fn render_json<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<&mut Self, DispatchError> {
        let body = self.json(value)?;
        self.resp_headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.resp_body = Some(body);
        Ok(self)
    }

    /// Plain-text response body.
    pub fn text(&mut self, body: impl Into<String>) -> &mut Self {
        self.resp_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.resp_body = Some(body.into());
        self
    }

    pub fn resp_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.resp_headers
    }

    pub fn resp_body(&self) -> Option<&str> {
        self.resp_body.as_deref()
    }

    /// Split into the pieces the transport writes out.
    pub fn into_response_parts(self) -> (StatusCode, HeaderMap, Option<String>) {
        (self.status, self.resp_headers, self.resp_body)
    }
}
