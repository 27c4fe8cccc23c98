use std::fmt;
use std::time::Duration;

use http::Method;
use serde_json::Value;

/// One outbound HTTP call. Built once, consumed by the client that sends it.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl ProbeRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Observed status of a probe. Transport-level failures are a sentinel rather
/// than an error so a burst can keep counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeStatus {
    Http(u16),
    TransportFailure,
}

impl ProbeStatus {
    pub const OK: ProbeStatus = ProbeStatus::Http(200);
    pub const CREATED: ProbeStatus = ProbeStatus::Http(201);
    pub const TOO_MANY_REQUESTS: ProbeStatus = ProbeStatus::Http(429);

    pub fn is(self, code: u16) -> bool {
        self == ProbeStatus::Http(code)
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Http(code) => write!(f, "{code}"),
            ProbeStatus::TransportFailure => f.write_str("transport failure"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub status: ProbeStatus,
    pub latency: Duration,
    /// Parsed body, when the response carried valid JSON.
    pub json: Option<Value>,
    /// Raw body text (or the transport error message).
    pub text: String,
}

impl ProbeResult {
    pub fn transport_failure(latency: Duration, reason: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::TransportFailure,
            latency,
            json: None,
            text: reason.into(),
        }
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }

    /// Best-effort rendering of the body for failure reports.
    pub fn body_for_report(&self) -> String {
        match &self.json {
            Some(v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| self.text.clone()),
            None => self.text.clone(),
        }
    }
}
