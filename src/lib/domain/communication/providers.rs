//! Email provider identities and the factory that maps them to mailers.

use std::{fmt, str::FromStr, sync::Arc};

use thiserror::Error;

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::mailer::Mailer;

/// The backends an email can be delivered through.
///
/// Declaration order is the failover order: when the primary provider fails,
/// the remaining providers are tried in the order they appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderIdentity {
    /// Aliyun DirectMail (signed RPC API)
    AliyunDirectMail,

    /// Tencent Cloud SES (TC3 signed JSON API)
    TencentSes,

    /// Enterprise SMTP relay
    EnterpriseSmtp,

    /// Standard SMTP relay
    StandardSmtp,
}

/// Error returned when a configured provider name is not recognised
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown email provider \"{0}\", expected one of: aliyun, tencent, enterprise_smtp, standard_smtp")]
pub struct UnknownProviderError(pub String);

impl ProviderIdentity {
    /// Every provider, in failover order
    pub const ALL: [ProviderIdentity; 4] = [
        ProviderIdentity::AliyunDirectMail,
        ProviderIdentity::TencentSes,
        ProviderIdentity::EnterpriseSmtp,
        ProviderIdentity::StandardSmtp,
    ];

    /// The configuration name of the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AliyunDirectMail => "aliyun",
            Self::TencentSes => "tencent",
            Self::EnterpriseSmtp => "enterprise_smtp",
            Self::StandardSmtp => "standard_smtp",
        }
    }

    /// The providers to try, in order, after this one has failed
    pub fn fallbacks(self) -> impl Iterator<Item = ProviderIdentity> {
        Self::ALL.into_iter().filter(move |provider| *provider != self)
    }
}

impl FromStr for ProviderIdentity {
    type Err = UnknownProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase().replace('-', "_");

        Self::ALL
            .into_iter()
            .find(|provider| provider.as_str() == normalised)
            .ok_or_else(|| UnknownProviderError(s.to_string()))
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the [`Mailer`] for a provider.
pub trait MailerFactory: Send + Sync + 'static {
    /// Returns the mailer for `provider`.
    fn create(&self, provider: ProviderIdentity) -> Arc<dyn Mailer>;
}

#[cfg(test)]
mock! {
    pub MailerFactory {}

    impl MailerFactory for MailerFactory {
        fn create(&self, provider: ProviderIdentity) -> Arc<dyn Mailer>;
    }
}
