//! Delivery results

use tracing::{debug, warn};

use crate::domain::communication::providers::ProviderIdentity;

use super::MailerError;

/// A single provider's failed attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderFailure {
    /// The provider that failed
    pub provider: ProviderIdentity,

    /// What it reported
    pub error: String,
}

/// The outcome of a delivery attempt.
///
/// `message_id` is only meaningful when `success` is true, `error` only when
/// it is false.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryResult {
    /// Whether the message was accepted by a provider
    pub success: bool,

    /// The provider-assigned message identifier
    pub message_id: Option<String>,

    /// A human-readable description of the failure
    pub error: Option<String>,

    /// The provider that produced this result, if any
    pub provider: Option<ProviderIdentity>,

    /// Every failed attempt that preceded this result
    pub failures: Vec<ProviderFailure>,
}

impl DeliveryResult {
    /// A successful delivery
    pub fn delivered(provider: ProviderIdentity, message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
            provider: Some(provider),
            failures: Vec::new(),
        }
    }

    /// A failed delivery
    pub fn failed(provider: Option<ProviderIdentity>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            provider,
            failures: Vec::new(),
        }
    }

    /// Attaches the failed attempts that led to this result
    pub fn with_failures(mut self, failures: Vec<ProviderFailure>) -> Self {
        self.failures = failures;
        self
    }

    /// Converts an adapter's internal outcome into a result, logging failures.
    pub fn from_outcome(provider: ProviderIdentity, outcome: Result<String, MailerError>) -> Self {
        match outcome {
            Ok(message_id) => {
                debug!(%provider, %message_id, "provider accepted message");
                Self::delivered(provider, message_id)
            }
            Err(err) => {
                warn!(%provider, error = %err, "provider failed to send message");
                Self::failed(Some(provider), err.to_string())
            }
        }
    }
}
