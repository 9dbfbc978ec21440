//! Local simulation fallback. Logs the delivery and reports success.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use super::{DeliveryProvider, ProviderError, ProviderReceipt};
use crate::types::DeliveryRequest;

/// Default registry name.
pub const DEFAULT_NAME: &str = "local-simulation";

/// Default simulated processing time.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

/// Development fallback that never reaches the network.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
    name: String,
    priority: u32,
    latency: Duration,
}

impl SimulatedProvider {
    /// Create the provider.
    pub fn new(name: impl Into<String>, priority: u32, latency: Duration) -> Self {
        Self {
            name: name.into(),
            priority,
            latency,
        }
    }
}

#[async_trait]
impl DeliveryProvider for SimulatedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn send(&self, request: &DeliveryRequest) -> Result<ProviderReceipt, ProviderError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        info!(
            provider = %self.name,
            recipients = request.recipient_count(),
            subject = %request.subject,
            body_len = request.effective_body().len(),
            html = request.html,
            template = request.template_id.as_deref().unwrap_or("-"),
            "simulated delivery"
        );
        Ok(ProviderReceipt::new("delivered via local simulation (simulated)"))
    }
}
