//! Outbound communication: messages, providers, delivery and notifications.

pub mod delivery;
pub mod email_addresses;
pub mod emails;
pub mod mailer;
pub mod notifications;
pub mod providers;
