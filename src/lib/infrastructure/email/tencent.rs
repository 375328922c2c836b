//! Tencent Cloud SES adapter (`SendEmail`, API version 2020-10-02)

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use clap::Parser;
use reqwest::{header, Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::domain::communication::{
    email_addresses::EmailAddress,
    mailer::{DeliveryResult, Mailer, MailerError, Message},
    providers::ProviderIdentity,
};

use super::{
    config::non_empty,
    signing::tc3::{self, Tc3Request},
};

const SERVICE: &str = "ses";
const ACTION: &str = "SendEmail";
const API_VERSION: &str = "2020-10-02";

/// Tencent Cloud SES credentials
#[derive(Clone, Debug, Parser)]
pub struct TencentConfig {
    /// The SES region
    #[arg(
        id = "tencent_ses_region",
        long = "tencent-ses-region",
        env = "TENCENT_SES_REGION",
        default_value = "ap-guangzhou"
    )]
    pub region: String,

    /// The API endpoint
    #[arg(
        id = "tencent_ses_endpoint",
        long = "tencent-ses-endpoint",
        env = "TENCENT_SES_ENDPOINT",
        default_value = "https://ses.tencentcloudapi.com"
    )]
    pub endpoint: String,

    /// The API secret id
    #[arg(id = "tencent_secret_id", long = "tencent-secret-id", env = "TENCENT_SECRET_ID")]
    pub secret_id: Option<String>,

    /// The API secret key
    #[arg(
        id = "tencent_secret_key",
        long = "tencent-secret-key",
        env = "TENCENT_SECRET_KEY",
        hide_env_values = true
    )]
    pub secret_key: Option<String>,

    /// The approved template that renders `{{subject}}`, `{{html}}` and
    /// `{{text}}`. Without one, messages are sent as simple content.
    #[arg(
        id = "tencent_ses_template_id",
        long = "tencent-ses-template-id",
        env = "TENCENT_SES_TEMPLATE_ID"
    )]
    pub template_id: Option<u64>,
}

impl Default for TencentConfig {
    fn default() -> Self {
        Self {
            region: "ap-guangzhou".to_string(),
            endpoint: "https://ses.tencentcloudapi.com".to_string(),
            secret_id: None,
            secret_key: None,
            template_id: None,
        }
    }
}

impl TencentConfig {
    /// The settings that must still be provided before this provider can send
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if non_empty(&self.secret_id).is_none() {
            missing.push("TENCENT_SECRET_ID");
        }

        if non_empty(&self.secret_key).is_none() {
            missing.push("TENCENT_SECRET_KEY");
        }

        missing
    }

    /// The `Host` the request is signed for
    fn host(&self) -> Result<String, MailerError> {
        let url = Url::parse(&self.endpoint).map_err(|err| {
            MailerError::Configuration(format!("invalid TENCENT_SES_ENDPOINT: {err}"))
        })?;

        let host = url.host_str().ok_or_else(|| {
            MailerError::Configuration("TENCENT_SES_ENDPOINT has no host".to_string())
        })?;

        Ok(match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from_email_address: &'a str,
    destination: Vec<&'a str>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_addresses: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<TemplateContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simple: Option<SimpleContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentContent<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TemplateContent {
    #[serde(rename = "TemplateID")]
    template_id: u64,
    template_data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SimpleContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentContent<'a> {
    file_name: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailEnvelope {
    response: SendEmailResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailResponse {
    message_id: Option<String>,
    error: Option<ResponseError>,
    request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResponseError {
    code: String,
    message: String,
}

/// Sends email through the Tencent Cloud SES API
#[derive(Debug, Clone)]
pub struct TencentMailer {
    client: Client,
    config: TencentConfig,
}

impl TencentMailer {
    /// Creates a new mailer sharing `client`
    pub fn new(client: Client, config: TencentConfig) -> Self {
        Self { client, config }
    }

    /// The JSON request body for `message`
    fn payload(&self, message: &Message, from: &EmailAddress) -> Result<String, MailerError> {
        let (template, simple) = match self.config.template_id {
            Some(template_id) => {
                let data = json!({
                    "subject": message.subject,
                    "html": message.html_body.as_deref().unwrap_or_default(),
                    "text": message.text_body.as_deref().unwrap_or_default(),
                });

                let content = TemplateContent {
                    template_id,
                    template_data: data.to_string(),
                };

                (Some(content), None)
            }
            None => {
                let content = SimpleContent {
                    html: message.html_body.as_ref().map(|html| STANDARD.encode(html)),
                    text: message.text_body.as_ref().map(|text| STANDARD.encode(text)),
                };

                (None, Some(content))
            }
        };

        let request = SendEmailRequest {
            from_email_address: from.as_str(),
            destination: message.to.iter().map(EmailAddress::as_str).collect(),
            subject: &message.subject,
            reply_to_addresses: message.reply_to.as_ref().map(EmailAddress::as_str),
            template,
            simple,
            attachments: message
                .attachments
                .iter()
                .map(|attachment| AttachmentContent {
                    file_name: &attachment.filename,
                    content: STANDARD.encode(&attachment.content),
                })
                .collect(),
        };

        serde_json::to_string(&request)
            .map_err(|err| MailerError::Configuration(format!("could not encode request: {err}")))
    }

    async fn dispatch(&self, message: &Message) -> Result<String, MailerError> {
        message.validate()?;

        let (Some(secret_id), Some(secret_key)) = (
            non_empty(&self.config.secret_id),
            non_empty(&self.config.secret_key),
        ) else {
            return Err(MailerError::missing_credentials(&self.config.missing()));
        };

        let from = message
            .from
            .as_ref()
            .ok_or_else(|| MailerError::Configuration("message has no sender".to_string()))?;

        let host = self.config.host()?;
        let payload = self.payload(message, from)?;
        let timestamp = Utc::now().timestamp();

        let signed = Tc3Request {
            host: &host,
            service: SERVICE,
            payload: &payload,
            timestamp,
        };

        debug!(endpoint = %self.config.endpoint, recipients = message.to.len(), "sending via Tencent SES");

        let response = self
            .client
            .post(&self.config.endpoint)
            .header(header::CONTENT_TYPE, tc3::CONTENT_TYPE)
            .header(header::AUTHORIZATION, signed.authorization(secret_id, secret_key))
            .header("X-TC-Action", ACTION)
            .header("X-TC-Version", API_VERSION)
            .header("X-TC-Region", &self.config.region)
            .header("X-TC-Timestamp", timestamp.to_string())
            .body(payload)
            .send()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let envelope: SendEmailEnvelope = serde_json::from_str(&body)
            .map_err(|err| MailerError::ResponseParse(format!("HTTP {status}: {err}")))?;

        let response = envelope.response;

        if let Some(error) = response.error {
            debug!(code = %error.code, request_id = ?response.request_id, "SES rejected request");

            let text = format!("{}: {}", error.code, error.message);

            return Err(if error.code.starts_with("AuthFailure") {
                MailerError::Authentication(text)
            } else {
                MailerError::BackendRejection(text)
            });
        }

        response.message_id.ok_or_else(|| {
            MailerError::ResponseParse(format!("HTTP {status}: response has no MessageId"))
        })
    }
}

#[async_trait]
impl Mailer for TencentMailer {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::TencentSes
    }

    async fn send(&self, message: &Message) -> DeliveryResult {
        DeliveryResult::from_outcome(self.provider(), self.dispatch(message).await)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use testresult::TestResult;
    use wiremock::{
        matchers::{header, header_exists, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use crate::domain::communication::mailer::Attachment;

    use super::*;

    fn config(endpoint: String) -> TencentConfig {
        TencentConfig {
            endpoint,
            secret_id: Some("AKIDEXAMPLE".to_string()),
            secret_key: Some("secret".to_string()),
            template_id: Some(31337),
            ..TencentConfig::default()
        }
    }

    fn message() -> Message {
        Message::new([EmailAddress::new_unchecked("ana@example.com")], "Hello")
            .with_from(EmailAddress::new_unchecked("noreply@mail.example.com"))
            .with_html("<p>Hi</p>")
            .with_text("Hi")
    }

    #[test]
    fn test_template_payload() -> TestResult {
        let mailer = TencentMailer::new(Client::new(), config("https://ses.example.com".into()));
        let message = message()
            .with_reply_to(EmailAddress::new_unchecked("support@example.com"))
            .with_attachment(Attachment {
                filename: "hello.txt".to_string(),
                content: b"hello".to_vec(),
                content_type: "text/plain".to_string(),
            });
        let from = EmailAddress::new_unchecked("noreply@mail.example.com");

        let payload: Value = serde_json::from_str(&mailer.payload(&message, &from)?)?;

        assert_eq!(payload["FromEmailAddress"], "noreply@mail.example.com");
        assert_eq!(payload["Destination"], json!(["ana@example.com"]));
        assert_eq!(payload["ReplyToAddresses"], "support@example.com");
        assert_eq!(payload["Template"]["TemplateID"], 31337);
        assert_eq!(payload["Attachments"][0]["FileName"], "hello.txt");
        assert_eq!(payload["Attachments"][0]["Content"], "aGVsbG8=");
        assert!(payload.get("Simple").is_none());

        let data: Value =
            serde_json::from_str(payload["Template"]["TemplateData"].as_str().unwrap_or_default())?;

        assert_eq!(data, json!({"subject": "Hello", "html": "<p>Hi</p>", "text": "Hi"}));

        Ok(())
    }

    #[test]
    fn test_simple_payload_without_template() -> TestResult {
        let mailer = TencentMailer::new(
            Client::new(),
            TencentConfig {
                template_id: None,
                ..config("https://ses.example.com".into())
            },
        );
        let from = EmailAddress::new_unchecked("noreply@mail.example.com");

        let payload: Value = serde_json::from_str(&mailer.payload(&message(), &from)?)?;

        assert_eq!(payload["Simple"]["Html"], "PHA+SGk8L3A+");
        assert_eq!(payload["Simple"]["Text"], "SGk=");
        assert!(payload.get("Template").is_none());
        assert!(payload.get("ReplyToAddresses").is_none());
        assert!(payload.get("Attachments").is_none());

        Ok(())
    }

    #[test]
    fn test_signed_host_keeps_explicit_port() -> TestResult {
        assert_eq!(
            config("https://ses.tencentcloudapi.com".into()).host()?,
            "ses.tencentcloudapi.com"
        );
        assert_eq!(config("http://127.0.0.1:8080".into()).host()?, "127.0.0.1:8080");
        assert!(config("not a url".into()).host().is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_send_returns_message_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("X-TC-Action", "SendEmail"))
            .and(header("X-TC-Version", "2020-10-02"))
            .and(header("X-TC-Region", "ap-guangzhou"))
            .and(header_exists("X-TC-Timestamp"))
            .and(header_exists("Authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": {
                    "MessageId": "qcloudses-30-4123414323-date-20210101094334-syNARhMTbKI1",
                    "RequestId": "req-1"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = TencentMailer::new(Client::new(), config(server.uri()));

        let result = mailer.send(&message()).await;

        assert!(result.success);
        assert_eq!(
            result.message_id.as_deref(),
            Some("qcloudses-30-4123414323-date-20210101094334-syNARhMTbKI1")
        );
        assert_eq!(result.provider, Some(ProviderIdentity::TencentSes));
    }

    #[tokio::test]
    async fn test_auth_failure_is_an_authentication_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": {
                    "Error": {
                        "Code": "AuthFailure.SignatureFailure",
                        "Message": "The provided credentials could not be validated."
                    },
                    "RequestId": "req-2"
                }
            })))
            .mount(&server)
            .await;

        let mailer = TencentMailer::new(Client::new(), config(server.uri()));

        let result = mailer.send(&message()).await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("authentication error: AuthFailure.SignatureFailure: The provided credentials could not be validated.")
        );
    }

    #[tokio::test]
    async fn test_other_errors_are_backend_rejections() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Response": {
                    "Error": {
                        "Code": "FailedOperation.EmailAddrInBlacklist",
                        "Message": "The recipient is blocklisted."
                    },
                    "RequestId": "req-3"
                }
            })))
            .mount(&server)
            .await;

        let mailer = TencentMailer::new(Client::new(), config(server.uri()));

        let result = mailer.send(&message()).await;

        assert!(result
            .error
            .is_some_and(|error| error.starts_with("backend rejection: FailedOperation")));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_without_a_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mailer = TencentMailer::new(
            Client::new(),
            TencentConfig {
                secret_key: None,
                ..config(server.uri())
            },
        );

        let result = mailer.send(&message()).await;

        assert_eq!(
            result.error.as_deref(),
            Some("configuration error: missing TENCENT_SECRET_KEY")
        );
    }
}
