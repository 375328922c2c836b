//! Delivery coordinator: sends through the primary provider and fails over
//! to the others in declaration order.

use std::{borrow::Cow, fmt, iter, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    email_addresses::EmailAddress,
    mailer::{DeliveryResult, MailerError, Message, ProviderFailure},
    providers::{MailerFactory, ProviderIdentity},
};

/// The error reported when every provider failed
pub const ALL_SERVICES_FAILED: &str = "all email services failed";

/// How long a single provider attempt may take by default
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivery service
#[async_trait]
pub trait DeliveryService: Clone + Send + Sync + 'static {
    /// Delivers a message through the first provider that accepts it.
    ///
    /// # Arguments
    /// * `message` - The [`Message`] to deliver.
    ///
    /// # Returns
    /// The successful provider's [`DeliveryResult`], or a failed result whose
    /// error is [`ALL_SERVICES_FAILED`] and whose `failures` list every
    /// provider's error.
    async fn deliver(&self, message: &Message) -> DeliveryResult;
}

#[cfg(test)]
mock! {
    pub DeliveryService {}

    impl Clone for DeliveryService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl DeliveryService for DeliveryService {
        async fn deliver(&self, message: &Message) -> DeliveryResult;
    }
}

/// Delivery service implementation
pub struct DeliveryServiceImpl<F>
where
    F: MailerFactory,
{
    factory: Arc<F>,
    primary: ProviderIdentity,
    default_sender: Option<EmailAddress>,
    attempt_timeout: Duration,
}

impl<F> DeliveryServiceImpl<F>
where
    F: MailerFactory,
{
    /// Creates a new delivery service
    pub fn new(
        factory: Arc<F>,
        primary: ProviderIdentity,
        default_sender: Option<EmailAddress>,
    ) -> Self {
        Self {
            factory,
            primary,
            default_sender,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Sets the deadline for each provider attempt
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// The configured primary provider
    pub fn primary(&self) -> ProviderIdentity {
        self.primary
    }

    fn with_default_sender<'a>(&self, message: &'a Message) -> Cow<'a, Message> {
        match (&message.from, &self.default_sender) {
            (None, Some(sender)) => Cow::Owned(message.clone().with_from(sender.clone())),
            _ => Cow::Borrowed(message),
        }
    }

    async fn attempt(&self, provider: ProviderIdentity, message: &Message) -> DeliveryResult {
        let mailer = self.factory.create(provider);

        match timeout(self.attempt_timeout, mailer.send(message)).await {
            Ok(result) => result,
            Err(_) => DeliveryResult::failed(
                Some(provider),
                MailerError::Transport(format!(
                    "no response within {}s",
                    self.attempt_timeout.as_secs_f32()
                ))
                .to_string(),
            ),
        }
    }
}

impl<F> Clone for DeliveryServiceImpl<F>
where
    F: MailerFactory,
{
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            primary: self.primary,
            default_sender: self.default_sender.clone(),
            attempt_timeout: self.attempt_timeout,
        }
    }
}

impl<F> fmt::Debug for DeliveryServiceImpl<F>
where
    F: MailerFactory,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryServiceImpl")
            .field("primary", &self.primary)
            .field("default_sender", &self.default_sender)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

#[async_trait]
impl<F> DeliveryService for DeliveryServiceImpl<F>
where
    F: MailerFactory,
{
    #[instrument(skip_all, fields(primary = %self.primary, subject = %message.subject))]
    async fn deliver(&self, message: &Message) -> DeliveryResult {
        if let Err(err) = message.validate() {
            warn!(error = %err, "refusing to deliver invalid message");
            return DeliveryResult::failed(None, MailerError::from(err).to_string());
        }

        let message = self.with_default_sender(message);
        let mut failures = Vec::new();

        for provider in iter::once(self.primary).chain(self.primary.fallbacks()) {
            let result = self.attempt(provider, &message).await;

            if result.success {
                info!(
                    %provider,
                    message_id = ?result.message_id,
                    failed_before = failures.len(),
                    "email delivered"
                );

                return result;
            }

            let error = result.error.unwrap_or_default();
            warn!(%provider, %error, "email provider failed, trying next");
            failures.push(ProviderFailure { provider, error });
        }

        error!(?failures, "all email services failed");

        DeliveryResult::failed(None, ALL_SERVICES_FAILED).with_failures(failures)
    }
}
