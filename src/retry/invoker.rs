//! Retrying invoker over the bounded executor.

use std::time::Duration;

use crate::executor::{sanitize_error_body, BoundedExecutor, ExecuteError, HttpResponse, RequestSpec};

use super::{is_retryable_status, run, RetryError, RetryPolicy, Retryable};

/// Why a single HTTP attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpFailure {
    /// No response: timeout or transport failure.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    /// The remote answered with a non-success status.
    #[error("status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
}

impl Retryable for HttpFailure {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Execute(_) => true,
            Self::Status { status, .. } => is_retryable_status(*status),
        }
    }
}

/// Failure of a whole [`RetryingInvoker::invoke`] sequence.
pub type InvokeError = RetryError<HttpFailure>;

/// Wraps a [`BoundedExecutor`] with an attempt budget and backoff.
#[derive(Debug, Clone)]
pub struct RetryingInvoker {
    executor: BoundedExecutor,
    policy: RetryPolicy,
}

impl RetryingInvoker {
    /// Create an invoker with `policy` as its default policy.
    pub fn new(executor: BoundedExecutor, policy: RetryPolicy) -> Self {
        Self { executor, policy }
    }

    /// The underlying executor.
    pub fn executor(&self) -> &BoundedExecutor {
        &self.executor
    }

    /// The default policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// One bounded call, with the response status checked.
    ///
    /// # Errors
    ///
    /// Returns [`HttpFailure::Execute`] when no response arrived and
    /// [`HttpFailure::Status`] for non-2xx responses.
    pub async fn attempt(
        &self,
        target: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpFailure> {
        let response = self.executor.execute(target, request, timeout).await?;
        if response.is_success() {
            return Ok(response);
        }
        Err(HttpFailure::Status {
            status: response.status,
            body: sanitize_error_body(&response.body),
        })
    }

    /// Call `target` under the default policy.
    ///
    /// # Errors
    ///
    /// See [`RetryingInvoker::invoke_with`].
    pub async fn invoke(
        &self,
        target: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<HttpResponse, InvokeError> {
        self.invoke_with(target, request, timeout, &self.policy).await
    }

    /// Call `target` until a 2xx response, a terminal status, or exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::Terminal`] for non-retryable statuses (after a
    /// single attempt) and [`RetryError::Exhausted`] carrying the last
    /// failure once `policy` runs out of attempts.
    pub async fn invoke_with(
        &self,
        target: &str,
        request: &RequestSpec,
        timeout: Duration,
        policy: &RetryPolicy,
    ) -> Result<HttpResponse, InvokeError> {
        let result = run(policy, move |_| self.attempt(target, request, timeout)).await;
        if let Err(err) = &result {
            tracing::warn!(target, attempts = err.attempts(), error = %err, "invocation failed");
        }
        result
    }
}
