//! The raw request query handed to the renderer.

use std::fmt;

use crate::error::GatewayError;

/// The unparsed query component of an incoming tile request.
///
/// The gateway never interprets the query: it is used verbatim as the
/// renderer's `QUERY_STRING` and as the input to the cache key digest.
/// The only invariant is that it is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestQuery(String);

impl RequestQuery {
    /// Wrap a raw query string, rejecting an empty one.
    pub fn new(raw: impl Into<String>) -> Result<Self, GatewayError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(GatewayError::EmptyQuery);
        }
        Ok(Self(raw))
    }

    /// Build from an optional query (absent query == empty query).
    pub fn from_optional(raw: Option<String>) -> Result<Self, GatewayError> {
        Self::new(raw.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The CGI-convention argument passed to the renderer.
    pub fn cgi_argument(&self) -> String {
        format!("QUERY_STRING={}", self.0)
    }
}

impl fmt::Display for RequestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
