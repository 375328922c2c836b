//! Mail delivery configuration

use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::debug;

use crate::domain::communication::{
    delivery::DEFAULT_ATTEMPT_TIMEOUT, email_addresses::EmailAddress, providers::ProviderIdentity,
};

use super::{
    aliyun::AliyunConfig,
    smtp::{EnterpriseSmtpConfig, SmtpRelayConfig, StandardSmtpConfig},
    tencent::TencentConfig,
};

/// Errors raised while turning configuration into mailers
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The shared HTTP client could not be created
    #[error("could not build the HTTP client: {0}")]
    HttpClient(reqwest::Error),
}

impl From<reqwest::Error> for ConfigError {
    fn from(err: reqwest::Error) -> Self {
        debug!("reqwest::Error -> ConfigError");

        ConfigError::HttpClient(err)
    }
}

/// Mail configuration, read once at startup
#[derive(Clone, Debug, Parser)]
pub struct MailConfig {
    /// The provider tried first: aliyun, tencent, enterprise_smtp or standard_smtp
    #[arg(long = "mail-provider", env = "MAIL_PROVIDER")]
    pub provider: ProviderIdentity,

    /// Sender used for messages that do not set one
    #[arg(long = "mail-default-sender", env = "MAIL_DEFAULT_SENDER")]
    pub default_sender: Option<EmailAddress>,

    /// How long a single provider may take to accept a message
    #[arg(
        long = "mail-send-timeout-secs",
        env = "MAIL_SEND_TIMEOUT_SECS",
        default_value_t = DEFAULT_ATTEMPT_TIMEOUT.as_secs()
    )]
    pub send_timeout_secs: u64,

    /// Aliyun DirectMail credentials
    #[clap(flatten)]
    pub aliyun: AliyunConfig,

    /// Tencent Cloud SES credentials
    #[clap(flatten)]
    pub tencent: TencentConfig,

    /// Enterprise relay settings
    #[clap(flatten)]
    pub enterprise_smtp: EnterpriseSmtpConfig,

    /// Standard relay settings
    #[clap(flatten)]
    pub standard_smtp: StandardSmtpConfig,
}

/// Whether a provider has everything it needs to send
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderHealth {
    /// The provider
    pub provider: ProviderIdentity,

    /// Whether it is the configured primary
    pub primary: bool,

    /// Whether its credentials are complete
    pub configured: bool,

    /// The settings still missing
    pub missing: Vec<String>,
}

impl MailConfig {
    /// The per-attempt deadline, never shorter than one second
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs.max(1))
    }

    /// Settings for the enterprise relay
    pub fn enterprise_relay(&self) -> SmtpRelayConfig {
        self.enterprise_smtp.clone().into()
    }

    /// Settings for the standard relay
    pub fn standard_relay(&self) -> SmtpRelayConfig {
        self.standard_smtp.clone().into()
    }

    /// Reports, in failover order, which providers can send
    pub fn health(&self) -> Vec<ProviderHealth> {
        ProviderIdentity::ALL
            .into_iter()
            .map(|provider| {
                let missing: Vec<String> = match provider {
                    ProviderIdentity::AliyunDirectMail => {
                        self.aliyun.missing().into_iter().map(String::from).collect()
                    }
                    ProviderIdentity::TencentSes => {
                        self.tencent.missing().into_iter().map(String::from).collect()
                    }
                    ProviderIdentity::EnterpriseSmtp => self.enterprise_relay().missing(),
                    ProviderIdentity::StandardSmtp => self.standard_relay().missing(),
                };

                ProviderHealth {
                    provider,
                    primary: provider == self.provider,
                    configured: missing.is_empty(),
                    missing,
                }
            })
            .collect()
    }
}

/// Treats blank settings as absent
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
