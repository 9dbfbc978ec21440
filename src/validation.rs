//! Structural checks run before any network activity.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::DeliveryRequest;

/// `local-part@domain.tld` with no whitespace and a single `@`.
static ADDRESS_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// Why a delivery request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Subject is empty or whitespace.
    #[error("subject is required")]
    MissingSubject,
    /// Message body is empty or whitespace.
    #[error("message is required")]
    MissingMessage,
    /// No recipient of any kind.
    #[error("at least one recipient is required")]
    NoRecipients,
    /// A direct address does not look like an email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}

/// Partition of an address list into well-formed and malformed entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressCheck {
    /// Well-formed addresses, trimmed, in input order.
    pub valid: Vec<String>,
    /// Malformed entries, trimmed, in input order.
    pub invalid: Vec<String>,
}

/// Returns `true` when `address` matches the basic address shape.
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(address))
}

/// Check subject, body and recipient count (rules 1 to 3).
///
/// # Errors
///
/// Returns the first rule that fails.
pub fn validate_envelope(request: &DeliveryRequest) -> Result<(), ValidationError> {
    if request.subject.trim().is_empty() {
        return Err(ValidationError::MissingSubject);
    }
    if request.message.trim().is_empty() {
        return Err(ValidationError::MissingMessage);
    }
    if request.recipients.is_empty() {
        return Err(ValidationError::NoRecipients);
    }
    Ok(())
}

/// Full validation: envelope rules, then every direct address.
///
/// # Errors
///
/// Returns the first rule that fails; for addresses, the first malformed one.
pub fn validate(request: &DeliveryRequest) -> Result<(), ValidationError> {
    validate_envelope(request)?;
    if let Some(bad) = request
        .recipients
        .emails
        .iter()
        .find(|address| !is_valid_address(address))
    {
        return Err(ValidationError::InvalidAddress(bad.clone()));
    }
    Ok(())
}

/// Split `addresses` into valid and invalid entries without dispatching.
pub fn validate_email_list(addresses: &[String]) -> AddressCheck {
    let mut check = AddressCheck::default();
    for address in addresses {
        let trimmed = address.trim().to_owned();
        if is_valid_address(&trimmed) {
            check.valid.push(trimmed);
        } else {
            check.invalid.push(trimmed);
        }
    }
    check
}
