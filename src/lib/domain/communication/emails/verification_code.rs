//! Verification code email

use askama::Template;

use crate::domain::communication::{
    email_addresses::EmailAddress, mailer::Message, notifications::NotificationError,
};

use super::{display_name, render_html, BRAND};

/// Verification code template
#[derive(Debug, Template)]
#[template(path = "emails/verification_code.html")]
pub struct VerificationCodeTemplate<'a> {
    /// The code the recipient has to enter
    pub code: &'a str,

    /// How the recipient is greeted
    pub name: &'a str,

    /// The product name
    pub brand: &'a str,
}

impl<'a> VerificationCodeTemplate<'a> {
    /// Creates a new `VerificationCodeTemplate`
    pub fn new(code: &'a str, name: Option<&'a str>) -> Self {
        Self {
            code,
            name: display_name(name),
            brand: BRAND,
        }
    }

    /// Renders the plain text version of the email
    pub fn render_plain(&self) -> String {
        format!(
            "Hi {name},\n\nYour {brand} verification code is: {code}\n\nIt expires in 10 minutes. If you did not ask for this code you can ignore this email.",
            name = self.name,
            brand = self.brand,
            code = self.code,
        )
    }
}

/// Builds the verification code email for `to`.
pub fn verification_message(
    to: &EmailAddress,
    code: &str,
    name: Option<&str>,
) -> Result<Message, NotificationError> {
    let template = VerificationCodeTemplate::new(code, name);

    Ok(
        Message::new([to.clone()], format!("Your {BRAND} verification code"))
            .with_html(render_html(&template)?)
            .with_text(template.render_plain()),
    )
}
