//! Aliyun DirectMail adapter (`SingleSendMail`)

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::Parser;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::communication::{
    email_addresses::EmailAddress,
    mailer::{DeliveryResult, Mailer, MailerError, Message},
    providers::ProviderIdentity,
};

use super::{config::non_empty, signing::rpc};

const ACTION: &str = "SingleSendMail";
const API_VERSION: &str = "2015-11-23";
const DEFAULT_REGION: &str = "cn-hangzhou";

/// Aliyun DirectMail credentials
#[derive(Clone, Debug, Parser)]
pub struct AliyunConfig {
    /// The DirectMail region
    #[arg(
        id = "aliyun_dm_region",
        long = "aliyun-dm-region",
        env = "ALIYUN_DM_REGION",
        default_value = DEFAULT_REGION
    )]
    pub region: String,

    /// Overrides the endpoint derived from the region
    #[arg(id = "aliyun_dm_endpoint", long = "aliyun-dm-endpoint", env = "ALIYUN_DM_ENDPOINT")]
    pub endpoint: Option<String>,

    /// The access key id
    #[arg(
        id = "aliyun_access_key_id",
        long = "aliyun-access-key-id",
        env = "ALIYUN_ACCESS_KEY_ID"
    )]
    pub access_key_id: Option<String>,

    /// The access key secret
    #[arg(
        id = "aliyun_access_key_secret",
        long = "aliyun-access-key-secret",
        env = "ALIYUN_ACCESS_KEY_SECRET",
        hide_env_values = true
    )]
    pub access_key_secret: Option<String>,
}

impl Default for AliyunConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            access_key_id: None,
            access_key_secret: None,
        }
    }
}

impl AliyunConfig {
    /// The API endpoint for the configured region
    pub fn endpoint(&self) -> String {
        if let Some(endpoint) = non_empty(&self.endpoint) {
            return endpoint.to_string();
        }

        match self.region.trim() {
            "" | DEFAULT_REGION => "https://dm.aliyuncs.com/".to_string(),
            region => format!("https://dm.{region}.aliyuncs.com/"),
        }
    }

    /// The settings that must still be provided before this provider can send
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if non_empty(&self.access_key_id).is_none() {
            missing.push("ALIYUN_ACCESS_KEY_ID");
        }

        if non_empty(&self.access_key_secret).is_none() {
            missing.push("ALIYUN_ACCESS_KEY_SECRET");
        }

        missing
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SingleSendMailResponse {
    env_id: Option<String>,
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
}

/// Sends email through the DirectMail RPC API
#[derive(Debug, Clone)]
pub struct AliyunMailer {
    client: Client,
    config: AliyunConfig,
}

impl AliyunMailer {
    /// Creates a new mailer sharing `client`
    pub fn new(client: Client, config: AliyunConfig) -> Self {
        Self { client, config }
    }

    /// The unsigned request parameters for `message`
    fn parameters(
        &self,
        message: &Message,
        from: &EmailAddress,
        access_key_id: &str,
        timestamp: DateTime<Utc>,
        nonce: Uuid,
    ) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();

        let mut set = |key: &str, value: &str| {
            params.insert(key.to_string(), value.to_string());
        };

        set("Action", ACTION);
        set("Version", API_VERSION);
        set("Format", "JSON");
        set("RegionId", self.config.region.trim());
        set("AccessKeyId", access_key_id);
        set("SignatureMethod", rpc::SIGNATURE_METHOD);
        set("SignatureVersion", rpc::SIGNATURE_VERSION);
        set("SignatureNonce", &nonce.to_string());
        set("Timestamp", &timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        set("AccountName", from.as_str());
        set("AddressType", "1");
        set("ToAddress", &message.joined_recipients());
        set("Subject", &message.subject);

        match &message.reply_to {
            Some(reply_to) => {
                set("ReplyToAddress", "true");
                set("ReplyAddress", reply_to.as_str());
            }
            None => set("ReplyToAddress", "false"),
        }

        if let Some(html) = &message.html_body {
            set("HtmlBody", html);
        }

        if let Some(text) = &message.text_body {
            set("TextBody", text);
        }

        params
    }

    async fn dispatch(&self, message: &Message) -> Result<String, MailerError> {
        message.validate()?;

        let (Some(access_key_id), Some(access_key_secret)) = (
            non_empty(&self.config.access_key_id),
            non_empty(&self.config.access_key_secret),
        ) else {
            return Err(MailerError::missing_credentials(&self.config.missing()));
        };

        let from = message
            .from
            .as_ref()
            .ok_or_else(|| MailerError::Configuration("message has no sender".to_string()))?;

        if !message.attachments.is_empty() {
            warn!(
                count = message.attachments.len(),
                "DirectMail does not accept attachments, sending without them"
            );
        }

        let mut params =
            self.parameters(message, from, access_key_id, Utc::now(), Uuid::new_v4());
        let signature = rpc::sign("POST", &params, access_key_secret);
        params.insert("Signature".to_string(), signature);

        let endpoint = self.config.endpoint();
        debug!(%endpoint, recipients = message.to.len(), "sending via Aliyun DirectMail");

        let response = self
            .client
            .post(&endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let parsed: SingleSendMailResponse = serde_json::from_str(&body)
            .map_err(|err| MailerError::ResponseParse(format!("HTTP {status}: {err}")))?;

        match parsed.env_id {
            Some(env_id) if status.is_success() => Ok(env_id),
            _ => Err(rejection(status, parsed)),
        }
    }
}

fn rejection(status: StatusCode, response: SingleSendMailResponse) -> MailerError {
    let code = response.code.unwrap_or_default();
    let text = response
        .message
        .unwrap_or_else(|| format!("HTTP {status} without EnvId"));

    debug!(%status, %code, request_id = ?response.request_id, "DirectMail rejected request");

    let is_auth = status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || code.contains("AccessKey")
        || code.contains("Signature");

    match (code.is_empty(), is_auth) {
        (true, true) => MailerError::Authentication(text),
        (true, false) => MailerError::BackendRejection(text),
        (false, true) => MailerError::Authentication(format!("{code}: {text}")),
        (false, false) => MailerError::BackendRejection(format!("{code}: {text}")),
    }
}

#[async_trait]
impl Mailer for AliyunMailer {
    fn provider(&self) -> ProviderIdentity {
        ProviderIdentity::AliyunDirectMail
    }

    async fn send(&self, message: &Message) -> DeliveryResult {
        DeliveryResult::from_outcome(self.provider(), self.dispatch(message).await)
    }
}
