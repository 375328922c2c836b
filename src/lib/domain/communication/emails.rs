//! Branded notification emails.
//!
//! Each notification renders an askama template, inlines its CSS so mail
//! clients keep the styling, and pairs it with a plain text version.

mod password_reset;
mod verification_code;
mod welcome;

use askama::Template;

use crate::domain::communication::notifications::NotificationError;

pub use password_reset::{password_reset_message, PasswordResetTemplate};
pub use verification_code::{verification_message, VerificationCodeTemplate};
pub use welcome::{welcome_message, WelcomeTemplate};

/// The product name shown in every notification
pub const BRAND: &str = "Mailpilot";

/// The greeting used when the recipient's name is unknown
const FALLBACK_NAME: &str = "there";

fn display_name(name: Option<&str>) -> &str {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name,
        _ => FALLBACK_NAME,
    }
}

fn render_html(template: &impl Template) -> Result<String, NotificationError> {
    Ok(css_inline::inline(&template.render()?)?)
}
