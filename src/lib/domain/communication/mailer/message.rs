//! Email message

use thiserror::Error;

use crate::domain::communication::email_addresses::EmailAddress;

/// Reasons a message cannot be sent
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    /// The message has no recipients
    #[error("message has no recipients")]
    NoRecipients,

    /// The message has neither an HTML nor a plain text body
    #[error("message has no HTML or plain text body")]
    NoBody,
}

/// A file attached to a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    /// The file name shown to the recipient
    pub filename: String,

    /// The raw file content
    pub content: Vec<u8>,

    /// The MIME type of the content, e.g. `application/pdf`
    pub content_type: String,
}

/// Provider-agnostic email message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// The recipients of the email
    pub to: Vec<EmailAddress>,

    /// The sender of the email, the configured default sender when absent
    pub from: Option<EmailAddress>,

    /// The reply-to address
    pub reply_to: Option<EmailAddress>,

    /// The subject of the email
    pub subject: String,

    /// The HTML body of the email
    pub html_body: Option<String>,

    /// The plain text body of the email
    pub text_body: Option<String>,

    /// Attached files
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Creates a message without a body
    pub fn new(to: impl IntoIterator<Item = EmailAddress>, subject: impl Into<String>) -> Self {
        Self {
            to: to.into_iter().collect(),
            from: None,
            reply_to: None,
            subject: subject.into(),
            html_body: None,
            text_body: None,
            attachments: Vec::new(),
        }
    }

    /// Sets the HTML body
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    /// Sets the plain text body
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    /// Sets the sender
    pub fn with_from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the reply-to address
    pub fn with_reply_to(mut self, reply_to: EmailAddress) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// Adds an attachment
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Checks the message has at least one recipient and one body.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.to.is_empty() {
            return Err(MessageError::NoRecipients);
        }

        if self.html_body.is_none() && self.text_body.is_none() {
            return Err(MessageError::NoBody);
        }

        Ok(())
    }

    /// The recipients joined with commas, as batch APIs expect them
    pub fn joined_recipients(&self) -> String {
        self.to
            .iter()
            .map(EmailAddress::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(raw: &str) -> EmailAddress {
        EmailAddress::new_unchecked(raw)
    }

    #[test]
    fn test_message_with_text_body_is_valid() {
        let message = Message::new([address("a@x.com")], "Hi").with_text("body");

        assert_eq!(message.validate(), Ok(()));
    }

    #[test]
    fn test_message_without_recipients_is_invalid() {
        let message = Message::new([], "Hi").with_html("<p>body</p>");

        assert_eq!(message.validate(), Err(MessageError::NoRecipients));
    }

    #[test]
    fn test_message_without_body_is_invalid() {
        let message = Message::new([address("a@x.com")], "Hi");

        assert_eq!(message.validate(), Err(MessageError::NoBody));
    }

    #[test]
    fn test_joined_recipients() {
        let message = Message::new([address("a@x.com"), address("b@y.org")], "Hi");

        assert_eq!(message.joined_recipients(), "a@x.com,b@y.org");
    }
}
