//! Mailer module: the contract every provider adapter implements.

mod errors;
mod message;
mod result;

use async_trait::async_trait;

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::providers::ProviderIdentity;

pub use errors::MailerError;
pub use message::{Attachment, Message, MessageError};
pub use result::{DeliveryResult, ProviderFailure};

/// A provider adapter.
///
/// Implementations are stateless request executors holding only immutable
/// credentials. `send` never fails past its boundary: every failure is
/// reported through the returned [`DeliveryResult`].
#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// The provider this mailer delivers through.
    fn provider(&self) -> ProviderIdentity;

    /// Send a message.
    ///
    /// # Arguments
    /// * `message` - The [`Message`] to send.
    ///
    /// # Returns
    /// A successful [`DeliveryResult`] carrying the provider's message id, or
    /// a failed one describing what went wrong.
    async fn send(&self, message: &Message) -> DeliveryResult;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    #[async_trait]
    impl Mailer for Mailer {
        fn provider(&self) -> ProviderIdentity;
        async fn send(&self, message: &Message) -> DeliveryResult;
    }
}
