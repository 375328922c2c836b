//! Mailer errors

use thiserror::Error;

use super::MessageError;

/// Everything that can go wrong inside a provider adapter.
///
/// These never cross the adapter boundary as errors; the kind is kept only
/// as the prefix of the failed [`DeliveryResult`](super::DeliveryResult)'s
/// error text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MailerError {
    /// The credential bundle is incomplete or the message is unusable
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connection, TLS, DNS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend rejected the credentials
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The backend accepted the call but refused the message
    #[error("backend rejection: {0}")]
    BackendRejection(String),

    /// The backend answered with an unexpected shape
    #[error("response parse error: {0}")]
    ResponseParse(String),
}

impl From<MessageError> for MailerError {
    fn from(err: MessageError) -> Self {
        MailerError::Configuration(err.to_string())
    }
}

impl MailerError {
    /// A configuration error listing the missing credential settings
    pub fn missing_credentials(missing: &[&str]) -> Self {
        MailerError::Configuration(format!("missing {}", missing.join(", ")))
    }
}
