//! Delivery provider abstraction layer.
//!
//! Defines the [`DeliveryProvider`] trait every channel implements and the
//! error classification the provider chain relies on.
//!
//! Three channels are implemented:
//! - [`system_api::SystemApiProvider`]: the primary notification API
//! - [`direct::DirectSendProvider`]: a direct-send email endpoint
//! - [`simulated::SimulatedProvider`]: a local, always-succeeding fallback
//!
//! The [`registry::ProviderRegistry`] holds them in priority order.

use async_trait::async_trait;
use serde::Serialize;

use crate::retry::invoker::HttpFailure;
use crate::retry::Retryable;
use crate::types::{AttemptClassification, DeliveryRequest};

pub mod channel;
pub mod direct;
pub mod registry;
pub mod simulated;
pub mod system_api;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Classified failure of a provider send.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Transient failure: transport error, timeout, or a retryable status.
    #[error("{0}")]
    Retryable(String),
    /// Permanent failure for this provider; the chain moves on.
    #[error("{0}")]
    Terminal(String),
}

impl ProviderError {
    /// Attempt classification for diagnostics.
    pub fn classification(&self) -> AttemptClassification {
        match self {
            Self::Retryable(_) => AttemptClassification::Retryable,
            Self::Terminal(_) => AttemptClassification::Terminal,
        }
    }
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

impl From<HttpFailure> for ProviderError {
    fn from(failure: HttpFailure) -> Self {
        if failure.is_retryable() {
            Self::Retryable(failure.to_string())
        } else {
            Self::Terminal(failure.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Which part of a [`RecipientSet`](crate::types::RecipientSet) a provider delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryScope {
    /// Direct addresses plus user and role references.
    AllRecipients,
    /// Direct addresses only; user and role references were not sent.
    DirectAddressesOnly,
}

/// Acknowledgement returned by a provider that accepted a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReceipt {
    /// Human-readable confirmation.
    pub message: String,
    /// Recipients the delivery covered.
    pub scope: DeliveryScope,
}

impl ProviderReceipt {
    /// Receipt covering every recipient of the request.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            scope: DeliveryScope::AllRecipients,
        }
    }

    /// Receipt covering only the request's direct addresses.
    pub fn direct_addresses_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            scope: DeliveryScope::DirectAddressesOnly,
        }
    }
}

/// A delivery channel.
///
/// Implementations perform a single delivery attempt per [`send`] call;
/// retries are driven by the provider chain.
///
/// [`send`]: DeliveryProvider::send
#[async_trait]
pub trait DeliveryProvider: Send + Sync {
    /// Unique name within a registry.
    fn name(&self) -> &str;

    /// Position in the chain; lower is tried first.
    fn priority(&self) -> u32;

    /// Attempt to deliver `request`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] classified as retryable or terminal.
    async fn send(&self, request: &DeliveryRequest) -> Result<ProviderReceipt, ProviderError>;

    /// Whether the channel currently looks reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Snapshot of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Provider name.
    pub name: String,
    /// Chain priority.
    pub priority: u32,
    /// Health check result.
    pub available: bool,
}
