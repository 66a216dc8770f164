//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Split a pattern like `/users/:user_id/comments/:id` into segments
//! - Extract parameter names in pattern order
//! - Match a request path and capture parameter values positionally
//!
//! # Design Decisions
//! - No regex: literal segments compare byte-for-byte, so `.` or `+` in a
//!   pattern mean themselves
//! - A `:name` segment matches exactly one non-empty segment
//! - Duplicate parameter names are rejected at compile time

use std::collections::HashSet;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
    params: Vec<String>,
}

/// Prefix `path` with `/` when missing.
pub fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

impl PathPattern {
    /// Compile `pattern`, normalizing it to start with `/`.
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let source = normalize(pattern);
        let mut segments = Vec::new();
        let mut params = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for raw in source.split('/') {
            match raw.strip_prefix(':') {
                Some("") => return Err(ConfigError::InvalidPattern(source.clone())),
                Some(name) => {
                    if !seen.insert(name.to_string()) {
                        return Err(ConfigError::DuplicateParam(source.clone()));
                    }
                    params.push(name.to_string());
                    segments.push(Segment::Param);
                }
                None => segments.push(Segment::Literal(raw.to_string())),
            }
        }

        Ok(Self {
            source,
            segments,
            params,
        })
    }

    /// The normalized pattern string.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parameter names in pattern order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Captured parameter values in pattern order, or `None` on mismatch.
    pub fn captures(&self, path: &str) -> Option<Vec<String>> {
        let mut values = Vec::with_capacity(self.params.len());
        let mut parts = path.split('/');

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param if part.is_empty() => return None,
                Segment::Param => values.push(part.to_string()),
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(values)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }
}
