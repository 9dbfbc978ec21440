//! Primary notification API provider.
//!
//! Posts the full request, including user and role references, to
//! `{base_url}/notifications/email`. The API resolves users and roles to
//! addresses itself, so this is the only channel that can serve them.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::channel::HttpChannel;
use super::{DeliveryProvider, ProviderError, ProviderReceipt};
use crate::types::{DeliveryRequest, Priority, RecipientSet};

/// Default registry name.
pub const DEFAULT_NAME: &str = "system-api";

/// Delivery endpoint, relative to the base URL.
pub const SEND_PATH: &str = "notifications/email";

/// Health endpoint, relative to the base URL.
pub const HEALTH_PATH: &str = "health";

/// Request body of the notification API.
#[doc(hidden)]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemApiPayload<'a> {
    /// Notification title.
    pub title: &'a str,
    /// Subject line.
    pub subject: &'a str,
    /// Plain body.
    pub message: &'a str,
    /// Rich-text flag.
    pub html: bool,
    /// Rich-text body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_content: Option<&'a str>,
    /// Recipients, including user and role references.
    pub recipients: &'a RecipientSet,
    /// Template identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<&'a str>,
    /// Urgency.
    pub priority: Priority,
    /// Sender identity recorded by the API.
    #[serde(rename = "sent_by_id")]
    pub sent_by_id: &'a str,
}

/// Build the API payload for `request`.
#[doc(hidden)]
pub fn build_payload<'a>(request: &'a DeliveryRequest, sender_id: &'a str) -> SystemApiPayload<'a> {
    SystemApiPayload {
        title: &request.title,
        subject: &request.subject,
        message: &request.message,
        html: request.html,
        html_content: request.html_content.as_deref(),
        recipients: &request.recipients,
        template: request.template_id.as_deref(),
        priority: request.priority,
        sent_by_id: sender_id,
    }
}

/// Provider backed by the primary notification API.
#[derive(Debug, Clone)]
pub struct SystemApiProvider {
    name: String,
    priority: u32,
    sender_id: String,
    channel: HttpChannel,
}

impl SystemApiProvider {
    /// Create the provider.
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        sender_id: impl Into<String>,
        channel: HttpChannel,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            sender_id: sender_id.into(),
            channel,
        }
    }
}

#[async_trait]
impl DeliveryProvider for SystemApiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn send(&self, request: &DeliveryRequest) -> Result<ProviderReceipt, ProviderError> {
        if self.channel.token().is_none() {
            return Err(ProviderError::Terminal(
                "authentication token not configured".to_owned(),
            ));
        }

        let payload = serde_json::to_value(build_payload(request, &self.sender_id))
            .map_err(|e| ProviderError::Terminal(format!("failed to encode payload: {e}")))?;
        let response = self.channel.post(SEND_PATH, payload).await?;
        debug!(provider = %self.name, status = response.status, "notification API accepted delivery");

        Ok(ProviderReceipt::new("delivered via primary notification API"))
    }

    async fn health_check(&self) -> bool {
        self.channel.is_healthy(HEALTH_PATH).await
    }
}
