//! Provider registry

use std::{fmt, sync::Arc};

use reqwest::Client;
use tracing::debug;

use crate::domain::communication::{
    mailer::Mailer,
    providers::{MailerFactory, ProviderIdentity},
};

use super::{
    aliyun::AliyunMailer,
    config::{ConfigError, MailConfig},
    smtp::SmtpMailer,
    tencent::TencentMailer,
};

/// Holds one adapter per provider, built once from [`MailConfig`].
///
/// The HTTP adapters share a single [`Client`] and its connection pool.
#[derive(Clone)]
pub struct ProviderRegistry {
    aliyun: Arc<dyn Mailer>,
    tencent: Arc<dyn Mailer>,
    enterprise_smtp: Arc<dyn Mailer>,
    standard_smtp: Arc<dyn Mailer>,
}

impl ProviderRegistry {
    /// Builds every adapter
    pub fn new(config: &MailConfig) -> Result<Self, ConfigError> {
        let timeout = config.send_timeout();
        let client = Client::builder().timeout(timeout).build()?;

        debug!(timeout_secs = timeout.as_secs(), "building provider registry");

        Ok(Self {
            aliyun: Arc::new(AliyunMailer::new(client.clone(), config.aliyun.clone())),
            tencent: Arc::new(TencentMailer::new(client, config.tencent.clone())),
            enterprise_smtp: Arc::new(SmtpMailer::new(
                ProviderIdentity::EnterpriseSmtp,
                config.enterprise_relay(),
                timeout,
            )),
            standard_smtp: Arc::new(SmtpMailer::new(
                ProviderIdentity::StandardSmtp,
                config.standard_relay(),
                timeout,
            )),
        })
    }
}

impl MailerFactory for ProviderRegistry {
    fn create(&self, provider: ProviderIdentity) -> Arc<dyn Mailer> {
        match provider {
            ProviderIdentity::AliyunDirectMail => Arc::clone(&self.aliyun),
            ProviderIdentity::TencentSes => Arc::clone(&self.tencent),
            ProviderIdentity::EnterpriseSmtp => Arc::clone(&self.enterprise_smtp),
            ProviderIdentity::StandardSmtp => Arc::clone(&self.standard_smtp),
        }
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &ProviderIdentity::ALL)
            .finish()
    }
}
