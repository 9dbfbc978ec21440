//! Batch dispatcher.
//!
//! Splits a recipient list into bounded batches, pushes each through the
//! [`ProviderChain`] in order with a pacing pause in between, and merges the
//! per-batch outcomes. A failed batch never aborts the ones after it.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::chain::ProviderChain;
use crate::types::{DeliveryOutcome, DeliveryRequest, RecipientSet, SendOptions};
use crate::validation::validate_envelope;

/// Default maximum addresses per batch.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default pause between consecutive batches.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

/// A contiguous slice of the recipient list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 0-based position within the dispatch.
    pub index: usize,
    /// Addresses in this batch, in input order.
    pub addresses: Vec<String>,
}

impl Batch {
    /// 1-based batch number used in messages.
    pub fn number(&self) -> usize {
        self.index.saturating_add(1)
    }
}

/// Split `addresses` into contiguous batches of at most `size` (minimum 1).
pub fn partition(addresses: &[String], size: usize) -> Vec<Batch> {
    addresses
        .chunks(size.max(1))
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            addresses: chunk.to_vec(),
        })
        .collect()
}

/// Sequences batches through a [`ProviderChain`].
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    chain: ProviderChain,
    batch_size: usize,
    pacing: Duration,
}

impl BatchDispatcher {
    /// Create a dispatcher with the default batch size and pacing.
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain,
            batch_size: DEFAULT_BATCH_SIZE,
            pacing: DEFAULT_PACING,
        }
    }

    /// Override the batch size (zero is treated as one).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Override the pause between batches.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Addresses per batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Pause between batches.
    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// The chain each batch goes through.
    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Deliver `subject`/`body` to every address, batch by batch.
    pub async fn send_to_recipients(
        &self,
        addresses: &[String],
        subject: &str,
        body: &str,
        options: &SendOptions,
    ) -> DeliveryOutcome {
        self.send_to_recipients_cancellable(
            addresses,
            subject,
            body,
            options,
            &CancellationToken::new(),
        )
        .await
    }

    /// Like [`BatchDispatcher::send_to_recipients`], stopping early on `cancel`.
    ///
    /// Cancellation is honoured before each batch and during the pacing
    /// pause; a batch already in flight runs to completion. Batches that never
    /// started are reported as failed, and everything merged so far is
    /// returned.
    pub async fn send_to_recipients_cancellable(
        &self,
        addresses: &[String],
        subject: &str,
        body: &str,
        options: &SendOptions,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        let dispatch_id = Uuid::new_v4();
        let span = info_span!("dispatch", %dispatch_id, recipients = addresses.len());
        self.dispatch(addresses, subject, body, options, cancel)
            .instrument(span)
            .await
    }

    async fn dispatch(
        &self,
        addresses: &[String],
        subject: &str,
        body: &str,
        options: &SendOptions,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        let envelope = DeliveryRequest::new(subject, body, RecipientSet::from_emails(addresses.to_vec()))
            .with_options(options);
        if validate_envelope(&envelope).is_err() {
            // The chain validates again and returns the zero-sent outcome
            // without contacting any provider.
            return self.chain.send(&envelope).await;
        }

        let batches = partition(addresses, self.batch_size);
        let total = batches.len();
        info!(batches = total, batch_size = self.batch_size, "starting dispatch");

        let mut merged = DeliveryOutcome::default();
        for (position, batch) in batches.iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining = batches.get(position..).unwrap_or_default();
                warn!(skipped = remaining.len(), "dispatch cancelled");
                for skipped in remaining {
                    merge_failed_batch(&mut merged, skipped, "cancelled", Vec::new());
                }
                break;
            }

            info!(
                batch = batch.number(),
                of = total,
                size = batch.addresses.len(),
                "processing batch"
            );
            let request = DeliveryRequest::new(
                subject,
                body,
                RecipientSet::from_emails(batch.addresses.clone()),
            )
            .with_options(options);
            let outcome = self.chain.send(&request).await;
            merge_batch(&mut merged, batch, outcome);

            if position.saturating_add(1) < total {
                tokio::select! {
                    () = cancel.cancelled() => {}
                    () = tokio::time::sleep(self.pacing) => {}
                }
            }
        }

        merged.success = merged.sent_count > 0;
        merged.message = if merged.success {
            format!("sent to {}/{} recipients", merged.sent_count, addresses.len())
        } else {
            "delivery failed for all recipients".to_owned()
        };
        info!(
            sent = merged.sent_count,
            failed = merged.failed_count,
            "dispatch finished"
        );
        merged
    }
}

/// Fold one batch outcome into the running total.
fn merge_batch(total: &mut DeliveryOutcome, batch: &Batch, outcome: DeliveryOutcome) {
    if outcome.success {
        let errors = prefixed(batch, outcome.errors.iter());
        total.absorb(DeliveryOutcome {
            errors,
            ..outcome
        });
        return;
    }

    warn!(batch = batch.number(), reason = %outcome.message, "batch failed");
    let details = prefixed(batch, outcome.errors.iter());
    merge_failed_batch(total, batch, &outcome.message, details);
}

/// Count every address of `batch` as failed.
fn merge_failed_batch(total: &mut DeliveryOutcome, batch: &Batch, reason: &str, details: Vec<String>) {
    total.failed_count = total.failed_count.saturating_add(batch.addresses.len());
    total.failed_emails.extend(batch.addresses.iter().cloned());
    total.errors.push(format!("batch {}: {reason}", batch.number()));
    total.errors.extend(details);
}

fn prefixed<'a>(batch: &Batch, errors: impl Iterator<Item = &'a String>) -> Vec<String> {
    errors
        .map(|err| format!("batch {}: {err}", batch.number()))
        .collect()
}
