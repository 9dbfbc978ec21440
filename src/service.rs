//! Email service facade.
//!
//! Wires configuration into the dispatch pipeline and exposes the entry
//! points callers use: single request, explicit address list, address
//! validation and provider status.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{Config, ProviderConfig};
use crate::dispatch::{BatchDispatcher, ProviderChain};
use crate::executor::BoundedExecutor;
use crate::providers::channel::HttpChannel;
use crate::providers::direct::DirectSendProvider;
use crate::providers::registry::ProviderRegistry;
use crate::providers::simulated::SimulatedProvider;
use crate::providers::system_api::SystemApiProvider;
use crate::providers::{DeliveryProvider, ProviderStatus};
use crate::retry::invoker::RetryingInvoker;
use crate::types::{DeliveryOutcome, DeliveryRequest, SendOptions};
use crate::validation::{self, AddressCheck};

/// Cheaply cloneable handle over the chain and the batch dispatcher.
#[derive(Debug, Clone)]
pub struct EmailService {
    chain: ProviderChain,
    dispatcher: BatchDispatcher,
}

impl EmailService {
    /// Assemble a service from an existing dispatcher.
    pub fn new(dispatcher: BatchDispatcher) -> Self {
        Self {
            chain: dispatcher.chain().clone(),
            dispatcher,
        }
    }

    /// Build the full pipeline from `config`.
    ///
    /// `env` resolves the token environment variables named in the provider
    /// entries; pass `|k| std::env::var(k).ok()` in production.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the registry cannot be built.
    pub fn from_config(config: &Config, env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;

        let executor = BoundedExecutor::http(config.executor.timeout());
        let invoker = RetryingInvoker::new(executor, config.http_policy());

        let providers = config
            .providers
            .iter()
            .map(|entry| build_provider(entry, &invoker, &env))
            .collect::<Vec<_>>();

        let registry = ProviderRegistry::new(providers).context("failed to build provider registry")?;
        info!(providers = ?registry.names(), "provider registry ready");

        let chain = ProviderChain::new(registry, config.chain_policy());
        let dispatcher = BatchDispatcher::new(chain)
            .with_batch_size(config.batch.size)
            .with_pacing(config.batch.pacing());
        Ok(Self::new(dispatcher))
    }

    /// The provider chain.
    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// The batch dispatcher.
    pub fn dispatcher(&self) -> &BatchDispatcher {
        &self.dispatcher
    }

    /// Deliver one fully-formed request through the provider chain.
    pub async fn send_email(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        self.chain.send(request).await
    }

    /// Deliver `subject`/`body` to an explicit address list, in batches.
    pub async fn send_to_specific_emails(
        &self,
        addresses: &[String],
        subject: &str,
        body: &str,
        options: &SendOptions,
    ) -> DeliveryOutcome {
        self.dispatcher
            .send_to_recipients(addresses, subject, body, options)
            .await
    }

    /// Like [`EmailService::send_to_specific_emails`], stopping early on `cancel`.
    pub async fn send_to_specific_emails_cancellable(
        &self,
        addresses: &[String],
        subject: &str,
        body: &str,
        options: &SendOptions,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        self.dispatcher
            .send_to_recipients_cancellable(addresses, subject, body, options, cancel)
            .await
    }

    /// Split addresses into syntactically valid and invalid ones.
    pub fn validate_email_list(&self, addresses: &[String]) -> AddressCheck {
        validation::validate_email_list(addresses)
    }

    /// Health-check every provider in chain order.
    pub async fn provider_status(&self) -> Vec<ProviderStatus> {
        self.chain.registry().status().await
    }
}

fn build_provider(
    entry: &ProviderConfig,
    invoker: &RetryingInvoker,
    env: &impl Fn(&str) -> Option<String>,
) -> Arc<dyn DeliveryProvider> {
    match entry {
        ProviderConfig::SystemApi {
            name,
            priority,
            base_url,
            token_env,
            sender_id,
        } => {
            let token = env(token_env);
            if token.is_none() {
                debug!(provider = %name, env = %token_env, "no token configured");
            }
            let channel = HttpChannel::new(base_url.as_str(), invoker.clone()).with_token(token);
            Arc::new(SystemApiProvider::new(name.as_str(), *priority, sender_id.as_str(), channel))
        }
        ProviderConfig::DirectSend {
            name,
            priority,
            base_url,
            token_env,
        } => {
            let token = token_env.as_deref().and_then(|key| env(key));
            let channel = HttpChannel::new(base_url.as_str(), invoker.clone()).with_token(token);
            Arc::new(DirectSendProvider::new(name.as_str(), *priority, channel))
        }
        ProviderConfig::Simulated {
            name,
            priority,
            latency_ms,
        } => Arc::new(SimulatedProvider::new(
            name.as_str(),
            *priority,
            std::time::Duration::from_millis(*latency_ms),
        )),
    }
}
