//! Email configuration health handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::communication::{delivery::DeliveryService, notifications::NotificationService},
    infrastructure::{email::config::ProviderHealth, http::state::AppState},
};

/// One provider's configuration status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderHealthResponse {
    /// The provider name
    #[schema(example = "aliyun")]
    pub provider: String,

    /// Whether the provider is tried first
    pub primary: bool,

    /// Whether the provider has all the settings it needs
    pub configured: bool,

    /// The settings still missing
    #[schema(example = json!(["ALIYUN_ACCESS_KEY_SECRET"]))]
    pub missing: Vec<String>,
}

impl From<&ProviderHealth> for ProviderHealthResponse {
    fn from(health: &ProviderHealth) -> Self {
        Self {
            provider: health.provider.to_string(),
            primary: health.primary,
            configured: health.configured,
            missing: health.missing.clone(),
        }
    }
}

/// The email health response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EmailHealthResponse {
    /// Every provider, in failover order
    pub providers: Vec<ProviderHealthResponse>,
}

/// Report which email providers are configured
#[utoipa::path(
    get,
    operation_id = "email_health",
    tag = "System",
    path = "/api/v1/health/email",
    responses(
        (status = StatusCode::OK, description = "Provider configuration status", body = EmailHealthResponse),
    )
)]
pub async fn handler<D: DeliveryService, N: NotificationService>(
    State(state): State<AppState<D, N>>,
) -> Json<EmailHealthResponse> {
    Json(EmailHealthResponse {
        providers: state.email_health.iter().map(Into::into).collect(),
    })
}

#[cfg(test)]
mod tests {
    use axum_test::TestServer;
    use testresult::TestResult;

    use crate::infrastructure::http::{router, state::test_state};

    use super::EmailHealthResponse;

    #[tokio::test]
    async fn test_email_health_handler() -> TestResult {
        let response = TestServer::new(router(test_state(None, None)))?
            .get("/api/v1/health/email")
            .await;

        response.assert_status_ok();

        let json = response.json::<EmailHealthResponse>();
        let names: Vec<_> = json.providers.iter().map(|p| p.provider.as_str()).collect();

        assert_eq!(names, ["aliyun", "tencent", "enterprise_smtp", "standard_smtp"]);
        assert!(json.providers[0].primary);
        assert!(!json.providers[1].configured);
        assert_eq!(json.providers[1].missing, ["TENCENT_SECRET_KEY"]);

        Ok(())
    }
}
