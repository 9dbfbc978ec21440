//! Provider chain orchestrator.
//!
//! Validates a request, then tries each registered provider in priority
//! order under the chain's [`RetryPolicy`], returning on the first success.
//! Providers are never raced: most of them charge or rate-limit per call.

use tracing::{debug, info, instrument, warn};

use crate::providers::registry::ProviderRegistry;
use crate::providers::{DeliveryProvider, DeliveryScope};
use crate::retry::{self, RetryPolicy};
use crate::types::{AttemptClassification, AttemptRecord, DeliveryOutcome, DeliveryRequest};
use crate::validation::validate;

/// Outcome of a chain run plus the per-attempt diagnostics behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReport {
    /// What the caller gets back.
    pub outcome: DeliveryOutcome,
    /// One record per provider attempt, in order.
    pub attempts: Vec<AttemptRecord>,
}

/// Sequential, priority-ordered failover across providers.
#[derive(Debug, Clone)]
pub struct ProviderChain {
    registry: ProviderRegistry,
    policy: RetryPolicy,
}

impl ProviderChain {
    /// Create a chain over `registry`, retrying each provider under `policy`.
    pub fn new(registry: ProviderRegistry, policy: RetryPolicy) -> Self {
        Self { registry, policy }
    }

    /// The providers this chain tries.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Per-provider retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver `request` through the first provider that accepts it.
    pub async fn send(&self, request: &DeliveryRequest) -> DeliveryOutcome {
        self.send_detailed(request).await.outcome
    }

    /// Like [`ProviderChain::send`], also returning every attempt made.
    #[instrument(skip_all, fields(subject = %request.subject, recipients = request.recipient_count()))]
    pub async fn send_detailed(&self, request: &DeliveryRequest) -> ChainReport {
        if let Err(err) = validate(request) {
            warn!(error = %err, "delivery request rejected");
            let reason = err.to_string();
            return ChainReport {
                outcome: DeliveryOutcome::failed(
                    request,
                    format!("validation failed: {reason}"),
                    vec![reason],
                ),
                attempts: Vec::new(),
            };
        }

        let mut attempts: Vec<AttemptRecord> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut last_error: Option<String> = None;

        for provider in self.registry.iter() {
            let provider: &dyn DeliveryProvider = provider.as_ref();
            let name = provider.name();
            debug!(provider = name, priority = provider.priority(), "trying provider");

            let result = retry::run_observed(
                &self.policy,
                move |_| provider.send(request),
                |timing, result| {
                    let (classification, error) = match result {
                        Ok(_) => (AttemptClassification::Success, None),
                        Err(err) => (err.classification(), Some(err.to_string())),
                    };
                    if let Some(err) = &error {
                        warn!(
                            provider = name,
                            attempt = timing.number,
                            classification = ?classification,
                            error = %err,
                            "provider attempt failed"
                        );
                        errors.push(format!("{name} (attempt {}): {err}", timing.number));
                    }
                    attempts.push(AttemptRecord {
                        provider: name.to_owned(),
                        attempt: timing.number,
                        classification,
                        error,
                        elapsed: timing.elapsed,
                        started_at: timing.started_at,
                    });
                },
            )
            .await;

            match result {
                Ok(receipt) => {
                    info!(provider = name, scope = ?receipt.scope, "delivery accepted");
                    let message = format!("{}: {}", name, receipt.message);
                    let outcome = match receipt.scope {
                        DeliveryScope::AllRecipients => DeliveryOutcome::delivered(request, message),
                        DeliveryScope::DirectAddressesOnly => {
                            DeliveryOutcome::delivered_to_addresses(request, message)
                        }
                    };
                    return ChainReport { outcome, attempts };
                }
                Err(err) => {
                    warn!(
                        provider = name,
                        attempts = err.attempts(),
                        exhausted = err.is_exhausted(),
                        "provider failed, falling back"
                    );
                    last_error = Some(err.into_last_error().to_string());
                }
            }
        }

        let last = last_error.unwrap_or_else(|| "unknown error".to_owned());
        warn!(error = %last, "all providers failed");
        ChainReport {
            outcome: DeliveryOutcome::failed(
                request,
                format!("all providers failed; last error: {last}"),
                errors,
            ),
            attempts,
        }
    }
}
