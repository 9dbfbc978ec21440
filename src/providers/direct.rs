//! Direct-send email endpoint provider.
//!
//! Only handles explicit addresses; user and role references need the
//! primary API to be resolved.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::channel::HttpChannel;
use super::{DeliveryProvider, ProviderError, ProviderReceipt};
use crate::types::DeliveryRequest;

/// Default registry name.
pub const DEFAULT_NAME: &str = "direct-send";

/// Delivery endpoint, relative to the base URL.
pub const SEND_PATH: &str = "email/send";

/// Health endpoint, relative to the base URL.
pub const HEALTH_PATH: &str = "email/health";

/// Request body of the direct-send endpoint.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct DirectSendPayload<'a> {
    /// Subject line.
    pub subject: &'a str,
    /// Body, rich variant when `html` is set.
    pub message: &'a str,
    /// Rich-text flag.
    pub html: bool,
    /// Explicit recipients.
    pub recipients: DirectRecipients<'a>,
}

/// Recipient block of [`DirectSendPayload`].
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct DirectRecipients<'a> {
    /// Direct addresses.
    pub emails: &'a [String],
}

/// Response envelope of the direct-send endpoint.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct DirectSendResponse {
    /// Whether the endpoint accepted the delivery.
    pub success: bool,
    /// Endpoint message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Build the endpoint payload for `request`.
#[doc(hidden)]
pub fn build_payload(request: &DeliveryRequest) -> DirectSendPayload<'_> {
    DirectSendPayload {
        subject: &request.subject,
        message: request.effective_body(),
        html: request.html,
        recipients: DirectRecipients {
            emails: &request.recipients.emails,
        },
    }
}

/// Provider backed by the direct-send endpoint.
#[derive(Debug, Clone)]
pub struct DirectSendProvider {
    name: String,
    priority: u32,
    channel: HttpChannel,
}

impl DirectSendProvider {
    /// Create the provider.
    pub fn new(name: impl Into<String>, priority: u32, channel: HttpChannel) -> Self {
        Self {
            name: name.into(),
            priority,
            channel,
        }
    }
}

#[async_trait]
impl DeliveryProvider for DirectSendProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn send(&self, request: &DeliveryRequest) -> Result<ProviderReceipt, ProviderError> {
        if request.recipients.emails.is_empty() {
            return Err(ProviderError::Terminal(
                "direct send requires explicit addresses".to_owned(),
            ));
        }

        let payload = serde_json::to_value(build_payload(request))
            .map_err(|e| ProviderError::Terminal(format!("failed to encode payload: {e}")))?;
        let response = self.channel.post(SEND_PATH, payload).await?;

        // Bodies that are not the expected envelope are treated as accepted.
        if let Ok(envelope) = serde_json::from_str::<DirectSendResponse>(&response.body) {
            if !envelope.success {
                let reason = envelope
                    .message
                    .unwrap_or_else(|| "endpoint reported failure".to_owned());
                return Err(ProviderError::Retryable(reason));
            }
        }
        debug!(provider = %self.name, status = response.status, "direct-send endpoint accepted delivery");

        Ok(ProviderReceipt::direct_addresses_only(
            "delivered via direct-send endpoint",
        ))
    }

    async fn health_check(&self) -> bool {
        self.channel.is_healthy(HEALTH_PATH).await
    }
}
