//! Captured HTTP response

use serde::{Deserialize, Serialize};

/// Part of a response that a predicate or transformation operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// Raw header block
    Head,
    /// Response body
    #[default]
    Body,
}

/// A captured response
///
/// This is the single input expression nodes evaluate against. Headers are
/// kept as the raw header block so regex and length predicates see exactly
/// what was on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Response {
    /// URL the response was fetched from
    #[serde(default)]
    pub url: String,

    /// HTTP status code (0 when no response was captured)
    #[serde(default)]
    pub status_code: u16,

    /// Raw header block, one `Name: value` per line
    #[serde(default)]
    pub headers: String,

    /// Response body
    #[serde(default)]
    pub body: String,

    /// Round-trip time in milliseconds
    #[serde(default)]
    pub response_time_ms: u64,
}

impl Response {
    /// Create a response for a URL and status code
    pub fn new(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            status_code,
            ..Default::default()
        }
    }

    /// Set the header block
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Set the body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the response time
    pub fn with_response_time(mut self, millis: u64) -> Self {
        self.response_time_ms = millis;
        self
    }

    /// Text at the given location
    pub fn text(&self, location: Location) -> &str {
        match location {
            Location::Head => &self.headers,
            Location::Body => &self.body,
        }
    }

    /// Mutable text at the given location
    pub fn text_mut(&mut self, location: Location) -> &mut String {
        match location {
            Location::Head => &mut self.headers,
            Location::Body => &mut self.body,
        }
    }
}
