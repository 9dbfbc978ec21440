//! HTTP plumbing shared by the API-backed providers.

use serde_json::Value;

use crate::executor::{HttpResponse, RequestSpec};
use crate::retry::invoker::RetryingInvoker;

use super::ProviderError;

/// An HTTP endpoint family reached through a [`RetryingInvoker`].
#[derive(Debug, Clone)]
pub struct HttpChannel {
    base_url: String,
    invoker: RetryingInvoker,
    token: Option<String>,
}

impl HttpChannel {
    /// Create a channel rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, invoker: RetryingInvoker) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            invoker,
            token: None,
        }
    }

    /// Attach the bearer token sent with every request.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Configured bearer token.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Absolute URL for `path`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Single bounded `POST` of `body` to `path`.
    ///
    /// Retries are left to the caller, so this issues exactly one request.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ProviderError`] for timeouts, transport
    /// failures and non-2xx statuses.
    pub async fn post(&self, path: &str, body: Value) -> Result<HttpResponse, ProviderError> {
        let url = self.endpoint(path);
        let request = RequestSpec::post_json(body).with_bearer(self.token());
        let timeout = self.invoker.executor().default_timeout();
        Ok(self.invoker.attempt(&url, &request, timeout).await?)
    }

    /// Health-check `path` with `GET` under the invoker's retry policy.
    pub async fn is_healthy(&self, path: &str) -> bool {
        let url = self.endpoint(path);
        let request = RequestSpec::get().with_bearer(self.token());
        let timeout = self.invoker.executor().default_timeout();
        self.invoker.invoke(&url, &request, timeout).await.is_ok()
    }
}
