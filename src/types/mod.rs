//! Core delivery types shared by the validator, providers and dispatchers.
//!
//! A [`DeliveryRequest`] lives for one dispatch call. Everything produced
//! while serving it ([`AttemptRecord`], batches, [`DeliveryOutcome`]) is
//! created and dropped within that same call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Delivery urgency forwarded to providers that understand it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Bulk or informational messages.
    Low,
    /// Regular notifications.
    #[default]
    Medium,
    /// Time-sensitive notifications.
    High,
}

impl Priority {
    /// Wire representation of the priority.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Recipients of a delivery: direct addresses plus user and role references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientSet {
    /// Direct email addresses.
    #[serde(default)]
    pub emails: Vec<String>,
    /// User identifiers resolved to addresses by the primary API.
    #[serde(default)]
    pub users: Vec<String>,
    /// Role names resolved to addresses by the primary API.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl RecipientSet {
    /// Recipient set made only of direct addresses.
    pub fn from_emails(emails: Vec<String>) -> Self {
        Self {
            emails,
            ..Self::default()
        }
    }

    /// Total number of recipients across all three collections.
    pub fn count(&self) -> usize {
        self.emails
            .len()
            .saturating_add(self.users.len())
            .saturating_add(self.roles.len())
    }

    /// Returns `true` when no recipient of any kind is present.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// A message to deliver to a [`RecipientSet`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    /// Notification title shown in the sender's history.
    pub title: String,
    /// Email subject line.
    pub subject: String,
    /// Plain-text (or rich-text, see `html`) message body.
    pub message: String,
    /// Whether the body should be sent as rich text.
    #[serde(default)]
    pub html: bool,
    /// Rich-text variant of the body, used when `html` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    /// Who should receive the message.
    pub recipients: RecipientSet,
    /// Template identifier understood by the primary API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Delivery urgency.
    #[serde(default)]
    pub priority: Priority,
}

impl DeliveryRequest {
    /// Build a plain-text request whose title equals its subject.
    pub fn new(
        subject: impl Into<String>,
        message: impl Into<String>,
        recipients: RecipientSet,
    ) -> Self {
        let subject = subject.into();
        Self {
            title: subject.clone(),
            subject,
            message: message.into(),
            html: false,
            html_content: None,
            recipients,
            template_id: None,
            priority: Priority::default(),
        }
    }

    /// Apply per-call [`SendOptions`] to this request.
    pub fn with_options(mut self, options: &SendOptions) -> Self {
        self.html = options.html;
        self.html_content.clone_from(&options.html_content);
        self.template_id.clone_from(&options.template_id);
        self.priority = options.priority;
        self
    }

    /// Total number of recipients.
    pub fn recipient_count(&self) -> usize {
        self.recipients.count()
    }

    /// Body a channel should transmit: the rich variant when requested and present.
    pub fn effective_body(&self) -> &str {
        match (&self.html_content, self.html) {
            (Some(content), true) => content,
            _ => &self.message,
        }
    }
}

/// Options for [`crate::dispatch::batch::BatchDispatcher::send_to_recipients`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SendOptions {
    /// Send the body as rich text.
    pub html: bool,
    /// Rich-text body variant.
    pub html_content: Option<String>,
    /// Template identifier.
    pub template_id: Option<String>,
    /// Delivery urgency.
    pub priority: Priority,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a dispatch, merged across providers and batches.
///
/// Callers always receive one of these, even when every provider failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOutcome {
    /// Whether at least part of the delivery went through.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Number of recipients delivered to.
    pub sent_count: usize,
    /// Number of recipients not delivered to.
    pub failed_count: usize,
    /// Direct addresses delivered to.
    pub sent_emails: Vec<String>,
    /// Direct addresses not delivered to.
    pub failed_emails: Vec<String>,
    /// Diagnostic error strings, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl DeliveryOutcome {
    /// Outcome for a request fully accepted by a channel.
    pub fn delivered(request: &DeliveryRequest, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            sent_count: request.recipient_count(),
            failed_count: 0,
            sent_emails: request.recipients.emails.clone(),
            failed_emails: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Outcome for a channel that delivered to the direct addresses only.
    ///
    /// User and role references were never sent, so they count as failed.
    pub fn delivered_to_addresses(request: &DeliveryRequest, message: impl Into<String>) -> Self {
        let recipients = &request.recipients;
        let skipped = recipients.users.len().saturating_add(recipients.roles.len());
        let mut errors = Vec::new();
        if skipped > 0 {
            errors.push(format!(
                "{skipped} user/role recipient(s) not delivered: channel accepts direct addresses only"
            ));
        }
        Self {
            success: !recipients.emails.is_empty(),
            message: message.into(),
            sent_count: recipients.emails.len(),
            failed_count: skipped,
            sent_emails: recipients.emails.clone(),
            failed_emails: Vec::new(),
            errors,
        }
    }

    /// Outcome for a request nothing was delivered for.
    pub fn failed(request: &DeliveryRequest, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            sent_count: 0,
            failed_count: request.recipient_count(),
            sent_emails: Vec::new(),
            failed_emails: request.recipients.emails.clone(),
            errors,
        }
    }

    /// Add another outcome's counts, address lists and errors to this one.
    ///
    /// `success` and `message` are left untouched; the caller decides them
    /// once everything has been merged.
    pub fn absorb(&mut self, other: DeliveryOutcome) {
        self.sent_count = self.sent_count.saturating_add(other.sent_count);
        self.failed_count = self.failed_count.saturating_add(other.failed_count);
        self.sent_emails.extend(other.sent_emails);
        self.failed_emails.extend(other.failed_emails);
        self.errors.extend(other.errors);
    }
}

// ---------------------------------------------------------------------------
// Attempts
// ---------------------------------------------------------------------------

/// How a single provider attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptClassification {
    /// The provider accepted the delivery.
    Success,
    /// Transient failure; another attempt may succeed.
    Retryable,
    /// Permanent failure for this provider.
    Terminal,
}

/// Diagnostic record of one provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Provider that was tried.
    pub provider: String,
    /// 1-based attempt number within that provider.
    pub attempt: u32,
    /// How the attempt ended.
    pub classification: AttemptClassification,
    /// Error detail for failed attempts.
    pub error: Option<String>,
    /// Wall-clock time spent in the provider call.
    pub elapsed: Duration,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
}
