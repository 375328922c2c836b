//! Welcome email

use askama::Template;

use crate::domain::communication::{
    email_addresses::EmailAddress, mailer::Message, notifications::NotificationError,
};

use super::{display_name, render_html, BRAND};

/// Welcome template, sent after registration
#[derive(Debug, Template)]
#[template(path = "emails/welcome.html")]
pub struct WelcomeTemplate<'a> {
    /// How the recipient is greeted
    pub name: &'a str,

    /// The product name
    pub brand: &'a str,
}

impl<'a> WelcomeTemplate<'a> {
    /// Creates a new `WelcomeTemplate`
    pub fn new(name: &'a str) -> Self {
        Self {
            name: display_name(Some(name)),
            brand: BRAND,
        }
    }

    /// Renders the plain text version of the email
    pub fn render_plain(&self) -> String {
        format!(
            "Welcome aboard, {name}!\n\nThanks for signing up to {brand}. Your account is ready and your first campaign is only a few clicks away.",
            name = self.name,
            brand = self.brand,
        )
    }
}

/// Builds the welcome email for `to`.
pub fn welcome_message(to: &EmailAddress, name: &str) -> Result<Message, NotificationError> {
    let template = WelcomeTemplate::new(name);

    Ok(Message::new([to.clone()], format!("Welcome to {BRAND}"))
        .with_html(render_html(&template)?)
        .with_text(template.render_plain()))
}
