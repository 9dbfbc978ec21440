//! Bounded request execution.
//!
//! [`BoundedExecutor`] issues exactly one outbound call per invocation and
//! enforces a hard wall-clock limit on it. When the limit elapses the
//! in-flight future is dropped, which cancels the underlying request, and
//! [`ExecuteError::Timeout`] is returned. Status codes are not interpreted
//! here; classification lives in [`crate::retry`].

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

pub mod http;

/// Default wall-clock bound for a single outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// HTTP method of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`, used for health checks.
    Get,
    /// `POST`, used for deliveries.
    Post,
}

/// Everything needed to issue one outbound call, minus the target URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Bearer token sent in the `Authorization` header.
    pub bearer_token: Option<String>,
}

impl RequestSpec {
    /// A bodiless `GET`.
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
            headers: Vec::new(),
            bearer_token: None,
        }
    }

    /// A `POST` carrying a JSON body.
    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            headers: Vec::new(),
            bearer_token: None,
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer(mut self, token: Option<&str>) -> Self {
        self.bearer_token = token.map(str::to_owned);
        self
    }

    /// Attach an extra header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Raw response of an outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Network-level failure reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The remote endpoint could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request failed after the connection was established.
    #[error("request failed: {0}")]
    Request(String),
    /// The response body could not be read.
    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Outcome of a bounded call that produced no response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    /// The wall-clock bound elapsed before a response arrived.
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Issues a single network call. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` to `target` and return whatever the remote answered.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response could be obtained.
    async fn send(&self, target: &str, request: &RequestSpec)
        -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Runs one call through a [`Transport`] under a hard time bound.
#[derive(Clone)]
pub struct BoundedExecutor {
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl std::fmt::Debug for BoundedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedExecutor")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

impl BoundedExecutor {
    /// Create an executor over an arbitrary transport.
    pub fn new(transport: Arc<dyn Transport>, default_timeout: Duration) -> Self {
        Self {
            transport,
            default_timeout,
        }
    }

    /// Create an executor backed by [`http::ReqwestTransport`].
    pub fn http(default_timeout: Duration) -> Self {
        Self::new(Arc::new(http::ReqwestTransport::new()), default_timeout)
    }

    /// Timeout applied by [`BoundedExecutor::execute_default`].
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Issue one call to `target`, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Timeout`] when the bound elapses and
    /// [`ExecuteError::Transport`] when the transport fails.
    pub async fn execute(
        &self,
        target: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<HttpResponse, ExecuteError> {
        match tokio::time::timeout(timeout, self.transport.send(target, request)).await {
            Ok(Ok(response)) => {
                tracing::debug!(target, status = response.status, "request completed");
                Ok(response)
            }
            Ok(Err(err)) => {
                tracing::debug!(target, error = %err, "request failed");
                Err(ExecuteError::Transport(err))
            }
            Err(_) => {
                tracing::debug!(target, timeout_ms = timeout.as_millis(), "request timed out");
                Err(ExecuteError::Timeout(timeout))
            }
        }
    }

    /// Issue one call bounded by the executor's default timeout.
    ///
    /// # Errors
    ///
    /// Same as [`BoundedExecutor::execute`].
    pub async fn execute_default(
        &self,
        target: &str,
        request: &RequestSpec,
    ) -> Result<HttpResponse, ExecuteError> {
        self.execute(target, request, self.default_timeout).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const MAX_ERROR_BODY_CHARS: usize = 256;

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)bearer\s+[A-Za-z0-9._\-]{8,}",
        r"sk-[A-Za-z0-9]{32,}",
        r"ghp_[A-Za-z0-9]{20,}",
        r"SG\.[A-Za-z0-9_\-]{16,}\.[A-Za-z0-9_\-]{16,}",
        r"xoxb-[A-Za-z0-9\-]{20,}",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Collapse whitespace, redact token-like values and truncate an error body
/// so it is safe to log and to return to callers.
pub fn sanitize_error_body(raw: &str) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for regex in SECRET_PATTERNS.iter() {
        sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
