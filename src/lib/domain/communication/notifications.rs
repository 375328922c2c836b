//! Transactional notifications sent on behalf of the account system.

use std::sync::Arc;

use async_trait::async_trait;
use css_inline::InlineError;
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::{
    delivery::DeliveryService,
    email_addresses::EmailAddress,
    emails::{password_reset_message, verification_message, welcome_message},
    mailer::{DeliveryResult, Message},
};

/// Errors that can occur when sending a notification
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The email template could not be rendered
    #[error("could not render email")]
    CouldNotRenderEmail,

    /// No provider accepted the email
    #[error("could not send email")]
    CouldNotSendEmail,
}

impl From<InlineError> for NotificationError {
    fn from(_err: InlineError) -> Self {
        debug!("InlineError -> NotificationError");

        NotificationError::CouldNotRenderEmail
    }
}

impl From<askama::Error> for NotificationError {
    fn from(_err: askama::Error) -> Self {
        debug!("askama::Error -> NotificationError");

        NotificationError::CouldNotRenderEmail
    }
}

/// The notifications this service knows how to send
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A short-lived code proving ownership of an address
    VerificationCode {
        /// The recipient
        to: EmailAddress,
        /// The code to send
        code: String,
        /// The recipient's name, if known
        name: Option<String>,
    },

    /// Sent once registration completes
    Welcome {
        /// The recipient
        to: EmailAddress,
        /// The recipient's name
        name: String,
    },

    /// A link to reset the account password
    PasswordReset {
        /// The recipient
        to: EmailAddress,
        /// The link to the reset form
        reset_link: String,
        /// The recipient's name, if known
        name: Option<String>,
    },
}

impl Notification {
    /// A short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VerificationCode { .. } => "verification_code",
            Self::Welcome { .. } => "welcome",
            Self::PasswordReset { .. } => "password_reset",
        }
    }

    /// Renders the notification into a message
    pub fn message(&self) -> Result<Message, NotificationError> {
        match self {
            Self::VerificationCode { to, code, name } => {
                verification_message(to, code, name.as_deref())
            }
            Self::Welcome { to, name } => welcome_message(to, name),
            Self::PasswordReset {
                to,
                reset_link,
                name,
            } => password_reset_message(to, reset_link, name.as_deref()),
        }
    }
}

/// Notification service
#[async_trait]
pub trait NotificationService: Clone + Send + Sync + 'static {
    /// Renders and delivers a notification.
    ///
    /// # Arguments
    /// * `notification` - The [`Notification`] to send.
    ///
    /// # Returns
    /// - [`Ok`] with the successful [`DeliveryResult`].
    /// - [`Err`] containing a [`NotificationError`] if the email could not be rendered or sent.
    async fn notify(&self, notification: &Notification)
        -> Result<DeliveryResult, NotificationError>;
}

#[cfg(test)]
mock! {
    pub NotificationService {}

    impl Clone for NotificationService {
        fn clone(&self) -> Self;
    }

    #[async_trait]
    impl NotificationService for NotificationService {
        async fn notify(&self, notification: &Notification) -> Result<DeliveryResult, NotificationError>;
    }
}

/// Notification service implementation
#[derive(Debug, Clone)]
pub struct NotificationServiceImpl<D>
where
    D: DeliveryService,
{
    deliveries: Arc<D>,
}

impl<D> NotificationServiceImpl<D>
where
    D: DeliveryService,
{
    /// Creates a new notification service
    pub fn new(deliveries: Arc<D>) -> Self {
        Self { deliveries }
    }
}

#[async_trait]
impl<D> NotificationService for NotificationServiceImpl<D>
where
    D: DeliveryService,
{
    async fn notify(
        &self,
        notification: &Notification,
    ) -> Result<DeliveryResult, NotificationError> {
        let message = notification.message()?;
        let result = self.deliveries.deliver(&message).await;

        if !result.success {
            warn!(kind = notification.kind(), error = ?result.error, "notification was not delivered");

            return Err(NotificationError::CouldNotSendEmail);
        }

        Ok(result)
    }
}
