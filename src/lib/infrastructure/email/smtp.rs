//! SMTP relay adapter, shared by the enterprise and standard relay profiles

use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use tracing::debug;
use uuid::Uuid;

use crate::domain::communication::{
    email_addresses::EmailAddress,
    mailer::{DeliveryResult, Mailer, MailerError, Message, MessageError},
    providers::ProviderIdentity,
};

use super::config::non_empty;

/// Port on which relays expect TLS from the first byte
const IMPLICIT_TLS_PORT: u16 = 465;

/// Connection settings for one SMTP relay
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmtpRelayConfig {
    /// The relay host
    pub host: String,

    /// The relay port
    pub port: u16,

    /// The login user
    pub username: Option<String>,

    /// The login password
    pub password: Option<String>,

    /// Prefix of the environment variables the relay is configured with
    pub env_prefix: &'static str,
}

impl SmtpRelayConfig {
    /// The settings that must still be provided before this relay can send
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.host.trim().is_empty() {
            missing.push(format!("{}_HOST", self.env_prefix));
        }

        if non_empty(&self.username).is_none() {
            missing.push(format!("{}_USER", self.env_prefix));
        }

        if non_empty(&self.password).is_none() {
            missing.push(format!("{}_PASSWORD", self.env_prefix));
        }

        missing
    }
}

/// Enterprise SMTP relay profile
#[derive(Clone, Debug, Parser)]
pub struct EnterpriseSmtpConfig {
    /// The relay host
    #[arg(
        id = "enterprise_smtp_host",
        long = "enterprise-smtp-host",
        env = "ENTERPRISE_SMTP_HOST",
        default_value = "smtp.exmail.qq.com"
    )]
    pub host: String,

    /// The relay port
    #[arg(
        id = "enterprise_smtp_port",
        long = "enterprise-smtp-port",
        env = "ENTERPRISE_SMTP_PORT",
        default_value = "465"
    )]
    pub port: u16,

    /// The login user
    #[arg(id = "enterprise_smtp_user", long = "enterprise-smtp-user", env = "ENTERPRISE_SMTP_USER")]
    pub username: Option<String>,

    /// The login password
    #[arg(
        id = "enterprise_smtp_password",
        long = "enterprise-smtp-password",
        env = "ENTERPRISE_SMTP_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,
}

impl From<EnterpriseSmtpConfig> for SmtpRelayConfig {
    fn from(config: EnterpriseSmtpConfig) -> Self {
        Self {
            host: config.host,
            port: config.port,
            username: config.username,
            password: config.password,
            env_prefix: "ENTERPRISE_SMTP",
        }
    }
}

/// Standard SMTP relay profile
#[derive(Clone, Debug, Parser)]
pub struct StandardSmtpConfig {
    /// The relay host
    #[arg(
        id = "standard_smtp_host",
        long = "standard-smtp-host",
        env = "STANDARD_SMTP_HOST",
        default_value = "smtp.qq.com"
    )]
    pub host: String,

    /// The relay port
    #[arg(
        id = "standard_smtp_port",
        long = "standard-smtp-port",
        env = "STANDARD_SMTP_PORT",
        default_value = "465"
    )]
    pub port: u16,

    /// The login user
    #[arg(id = "standard_smtp_user", long = "standard-smtp-user", env = "STANDARD_SMTP_USER")]
    pub username: Option<String>,

    /// The login password
    #[arg(
        id = "standard_smtp_password",
        long = "standard-smtp-password",
        env = "STANDARD_SMTP_PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,
}

impl From<StandardSmtpConfig> for SmtpRelayConfig {
    fn from(config: StandardSmtpConfig) -> Self {
        Self {
            host: config.host,
            port: config.port,
            username: config.username,
            password: config.password,
            env_prefix: "STANDARD_SMTP",
        }
    }
}

/// SMTP mailer
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    provider: ProviderIdentity,
    config: SmtpRelayConfig,
    timeout: Duration,
}

impl SmtpMailer {
    /// Creates a mailer delivering as `provider` through the relay in `config`
    pub fn new(provider: ProviderIdentity, config: SmtpRelayConfig, timeout: Duration) -> Self {
        Self {
            provider,
            config,
            timeout,
        }
    }

    /// Implicit TLS on port 465, STARTTLS when the relay offers it on any
    /// other port.
    fn tls(&self, host: &str) -> Result<Tls, MailerError> {
        let parameters = TlsParameters::new(host.to_string())
            .map_err(|err| MailerError::Configuration(err.to_string()))?;

        Ok(if self.config.port == IMPLICIT_TLS_PORT {
            Tls::Wrapper(parameters)
        } else {
            Tls::Opportunistic(parameters)
        })
    }

    fn transport(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailerError> {
        let host = self.config.host.trim();

        Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(self.config.port)
            .tls(self.tls(host)?)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .timeout(Some(self.timeout))
            .build())
    }

    /// Builds the MIME message, returning it with its generated Message-ID
    fn email(
        &self,
        message: &Message,
        from: &EmailAddress,
    ) -> Result<(lettre::Message, String), MailerError> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), from.domain());

        let mut builder = lettre::Message::builder()
            .from(mailbox(from)?)
            .subject(message.subject.clone())
            .message_id(Some(message_id.clone()));

        for to in &message.to {
            builder = builder.to(mailbox(to)?);
        }

        if let Some(reply_to) = &message.reply_to {
            builder = builder.reply_to(mailbox(reply_to)?);
        }

        let body = match (&message.html_body, &message.text_body) {
            (Some(html), Some(text)) => MultiPart::alternative_plain_html(text.clone(), html.clone()),
            (Some(html), None) => MultiPart::alternative().singlepart(SinglePart::html(html.clone())),
            (None, Some(text)) => MultiPart::alternative().singlepart(SinglePart::plain(text.clone())),
            (None, None) => return Err(MessageError::NoBody.into()),
        };

        let body = if message.attachments.is_empty() {
            body
        } else {
            let mut mixed = MultiPart::mixed().multipart(body);

            for attachment in &message.attachments {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|err| {
                    MailerError::Configuration(format!(
                        "attachment {} has an invalid content type: {err}",
                        attachment.filename
                    ))
                })?;

                mixed = mixed.singlepart(
                    lettre::message::Attachment::new(attachment.filename.clone())
                        .body(attachment.content.clone(), content_type),
                );
            }

            mixed
        };

        let email = builder
            .multipart(body)
            .map_err(|err| MailerError::Configuration(err.to_string()))?;

        Ok((email, message_id))
    }

    async fn dispatch(&self, message: &Message) -> Result<String, MailerError> {
        message.validate()?;

        let (Some(username), Some(password), false) = (
            non_empty(&self.config.username),
            non_empty(&self.config.password),
            self.config.host.trim().is_empty(),
        ) else {
            let missing = self.config.missing();
            let missing: Vec<&str> = missing.iter().map(String::as_str).collect();

            return Err(MailerError::missing_credentials(&missing));
        };

        let from = message
            .from
            .as_ref()
            .ok_or_else(|| MailerError::Configuration("message has no sender".to_string()))?;

        let (email, message_id) = self.email(message, from)?;
        let transport = self.transport(username, password)?;

        debug!(
            provider = %self.provider,
            host = %self.config.host,
            port = self.config.port,
            recipients = message.to.len(),
            "sending via SMTP relay"
        );

        let response = transport.send(email).await.map_err(classify)?;

        Ok(queued_id(response.message(), message_id))
    }
}

/// The relay's final reply identifies the queued message; an empty reply
/// falls back to the Message-ID header.
fn queued_id<'a>(reply: impl Iterator<Item = &'a str>, message_id: String) -> String {
    let reply = reply.collect::<Vec<_>>().join(" ");

    if reply.trim().is_empty() {
        message_id
    } else {
        reply
    }
}

fn mailbox(address: &EmailAddress) -> Result<Mailbox, MailerError> {
    address
        .as_str()
        .parse()
        .map_err(|err| MailerError::Configuration(format!("invalid address {address}: {err}")))
}

fn classify(err: lettre::transport::smtp::Error) -> MailerError {
    let text = err.to_string();

    if text.contains("535") || text.to_ascii_lowercase().contains("authentication") {
        MailerError::Authentication(text)
    } else if err.is_permanent() || err.is_transient() {
        MailerError::BackendRejection(text)
    } else {
        MailerError::Transport(text)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn provider(&self) -> ProviderIdentity {
        self.provider
    }

    async fn send(&self, message: &Message) -> DeliveryResult {
        DeliveryResult::from_outcome(self.provider, self.dispatch(message).await)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::TcpListener,
    };

    use crate::domain::communication::mailer::Attachment;

    use super::*;

    fn relay(port: u16) -> SmtpRelayConfig {
        SmtpRelayConfig {
            host: "127.0.0.1".to_string(),
            port,
            username: Some("mailer@example.com".to_string()),
            password: Some("hunter2".to_string()),
            env_prefix: "STANDARD_SMTP",
        }
    }

    fn mailer(config: SmtpRelayConfig) -> SmtpMailer {
        SmtpMailer::new(ProviderIdentity::StandardSmtp, config, Duration::from_secs(2))
    }

    fn message() -> Message {
        Message::new(
            [
                EmailAddress::new_unchecked("ana@example.com"),
                EmailAddress::new_unchecked("bo@example.org"),
            ],
            "Quarterly update",
        )
        .with_from(EmailAddress::new_unchecked("news@mail.example.com"))
        .with_reply_to(EmailAddress::new_unchecked("support@example.com"))
        .with_html("<p>Numbers are up</p>")
        .with_text("Numbers are up")
    }

    #[test]
    fn test_email_carries_every_header_and_both_bodies() -> TestResult {
        let from = EmailAddress::new_unchecked("news@mail.example.com");

        let (email, message_id) = mailer(relay(587)).email(&message(), &from)?;
        let raw = String::from_utf8(email.formatted())?;

        assert!(message_id.ends_with("@mail.example.com>"));
        assert!(raw.contains(&format!("Message-ID: {message_id}")));
        assert!(raw.contains("From: news@mail.example.com"));
        assert!(raw.contains("To: ana@example.com, bo@example.org"));
        assert!(raw.contains("Reply-To: support@example.com"));
        assert!(raw.contains("Subject: Quarterly update"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Numbers are up"));
        assert!(!raw.contains("multipart/mixed"));

        Ok(())
    }

    #[test]
    fn test_attachments_wrap_the_body_in_multipart_mixed() -> TestResult {
        let from = EmailAddress::new_unchecked("news@mail.example.com");
        let message = message()
            .with_attachment(Attachment {
                filename: "report.csv".to_string(),
                content: b"a,b\n1,2\n".to_vec(),
                content_type: "text/csv".to_string(),
            })
            .with_attachment(Attachment {
                filename: "notes.txt".to_string(),
                content: b"notes".to_vec(),
                content_type: "text/plain".to_string(),
            });

        let (email, _) = mailer(relay(587)).email(&message, &from)?;
        let raw = String::from_utf8(email.formatted())?;

        assert_eq!(raw.matches("multipart/mixed").count(), 1);
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("filename=\"report.csv\""));
        assert!(raw.contains("filename=\"notes.txt\""));

        Ok(())
    }

    #[test]
    fn test_invalid_attachment_content_type() {
        let from = EmailAddress::new_unchecked("news@mail.example.com");
        let message = message().with_attachment(Attachment {
            filename: "blob".to_string(),
            content: vec![0],
            content_type: "not a mime type".to_string(),
        });

        let result = mailer(relay(587)).email(&message, &from);

        assert!(matches!(result, Err(MailerError::Configuration(_))));
    }

    #[test]
    fn test_missing_settings_use_profile_names() {
        let config = SmtpRelayConfig {
            host: " ".to_string(),
            username: None,
            password: Some(String::new()),
            ..relay(465)
        };

        assert_eq!(
            config.missing(),
            vec!["STANDARD_SMTP_HOST", "STANDARD_SMTP_USER", "STANDARD_SMTP_PASSWORD"]
        );
    }

    #[test]
    fn test_profiles_convert_to_relay_settings() {
        let enterprise = SmtpRelayConfig::from(EnterpriseSmtpConfig {
            host: "smtp.exmail.qq.com".to_string(),
            port: 465,
            username: Some("ops@corp.example.com".to_string()),
            password: None,
        });

        assert_eq!(enterprise.env_prefix, "ENTERPRISE_SMTP");
        assert_eq!(enterprise.missing(), vec!["ENTERPRISE_SMTP_PASSWORD"]);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_connecting() {
        let result = mailer(SmtpRelayConfig {
            password: None,
            ..relay(587)
        })
        .send(&message())
        .await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("configuration error: missing STANDARD_SMTP_PASSWORD")
        );
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_a_transport_error() {
        // Nothing listens on port 9, connections are refused straight away.
        let result = mailer(relay(9)).send(&message()).await;

        assert!(!result.success);
        assert_eq!(result.provider, Some(ProviderIdentity::StandardSmtp));
        assert!(result
            .error
            .is_some_and(|error| error.starts_with("transport error")));
    }

    /// Starts a plaintext relay that accepts one session and answers the
    /// end of DATA with `queued`.
    async fn scripted_relay(queued: &'static str) -> std::io::Result<u16> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        tokio::spawn(async move {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();

            if write.write_all(b"220 relay.test ESMTP\r\n").await.is_err() {
                return;
            }

            while let Ok(Some(line)) = lines.next_line().await {
                let command = line.trim_end().to_ascii_uppercase();

                let reply = if command.starts_with("EHLO") {
                    "250-relay.test\r\n250 AUTH PLAIN LOGIN\r\n".to_string()
                } else if command.starts_with("AUTH") {
                    "235 2.7.0 Authentication successful\r\n".to_string()
                } else if command == "DATA" {
                    if write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.is_err() {
                        return;
                    }

                    while let Ok(Some(line)) = lines.next_line().await {
                        if line.trim_end() == "." {
                            break;
                        }
                    }

                    format!("250 {queued}\r\n")
                } else if command.starts_with("QUIT") {
                    let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
                    return;
                } else {
                    "250 2.1.0 Ok\r\n".to_string()
                };

                if write.write_all(reply.as_bytes()).await.is_err() {
                    return;
                }
            }
        });

        Ok(port)
    }

    #[tokio::test]
    async fn test_send_returns_the_relay_queue_reply() -> TestResult {
        let port = scripted_relay("2.0.0 Ok: queued as 4F2C1A").await?;

        let result = mailer(relay(port)).send(&message()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.provider, Some(ProviderIdentity::StandardSmtp));
        assert_eq!(result.message_id.as_deref(), Some("2.0.0 Ok: queued as 4F2C1A"));
        assert_eq!(result.error, None);

        Ok(())
    }

    #[test]
    fn test_queued_id_falls_back_to_message_id() {
        let message_id = "<abc@mail.example.com>".to_string();

        assert_eq!(
            queued_id(["Ok: queued as 4F2C1A"].into_iter(), message_id.clone()),
            "Ok: queued as 4F2C1A"
        );
        assert_eq!(queued_id([" "].into_iter(), message_id.clone()), message_id);
        assert_eq!(queued_id(std::iter::empty(), message_id.clone()), message_id);
    }

    #[test]
    fn test_tls_mode_follows_port() -> TestResult {
        let implicit = mailer(relay(465)).tls("smtp.example.com")?;
        assert!(matches!(implicit, Tls::Wrapper(_)));

        let starttls = mailer(relay(587)).tls("smtp.example.com")?;
        assert!(matches!(starttls, Tls::Opportunistic(_)));

        Ok(())
    }
}
