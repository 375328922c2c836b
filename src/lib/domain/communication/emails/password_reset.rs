//! Password reset email

use askama::Template;

use crate::domain::communication::{
    email_addresses::EmailAddress, mailer::Message, notifications::NotificationError,
};

use super::{display_name, render_html, BRAND};

/// Password reset template
#[derive(Debug, Template)]
#[template(path = "emails/password_reset.html")]
pub struct PasswordResetTemplate<'a> {
    /// Link to the reset form
    pub reset_link: &'a str,

    /// How the recipient is greeted
    pub name: &'a str,

    /// The product name
    pub brand: &'a str,
}

impl<'a> PasswordResetTemplate<'a> {
    /// Creates a new `PasswordResetTemplate`
    pub fn new(reset_link: &'a str, name: Option<&'a str>) -> Self {
        Self {
            reset_link,
            name: display_name(name),
            brand: BRAND,
        }
    }

    /// Renders the plain text version of the email
    pub fn render_plain(&self) -> String {
        format!(
            "Hi {name},\n\nWe received a request to reset the password for your {brand} account. Visit the following link to choose a new one: {link}\n\nThe link expires in 1 hour. If you did not request a reset your password has not been changed.",
            name = self.name,
            brand = self.brand,
            link = self.reset_link,
        )
    }
}

/// Builds the password reset email for `to`.
pub fn password_reset_message(
    to: &EmailAddress,
    reset_link: &str,
    name: Option<&str>,
) -> Result<Message, NotificationError> {
    let template = PasswordResetTemplate::new(reset_link, name);

    Ok(
        Message::new([to.clone()], format!("Reset your {BRAND} password"))
            .with_html(render_html(&template)?)
            .with_text(template.render_plain()),
    )
}
