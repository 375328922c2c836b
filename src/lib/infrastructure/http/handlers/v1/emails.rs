//! Email sending handlers

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::communication::mailer::DeliveryResult;

pub mod password_reset;
pub mod send_email;
pub mod verification_code;
pub mod welcome;

/// Returned when a provider accepted the email
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendEmailResponse {
    /// Always `true`
    pub success: bool,

    /// The identifier the provider assigned to the email
    #[schema(example = "600000000000")]
    pub message_id: Option<String>,

    /// The provider that accepted the email
    #[schema(example = "aliyun")]
    pub provider: Option<String>,
}

impl From<DeliveryResult> for SendEmailResponse {
    fn from(result: DeliveryResult) -> Self {
        Self {
            success: result.success,
            message_id: result.message_id,
            provider: result.provider.map(|provider| provider.to_string()),
        }
    }
}
