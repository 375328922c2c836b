//! Send a welcome email

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::communication::{
        delivery::DeliveryService,
        email_addresses::EmailAddress,
        notifications::{Notification, NotificationService},
    },
    infrastructure::http::{
        errors::ApiError, handlers::v1::emails::SendEmailResponse, state::AppState,
    },
};

/// Welcome email request body
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeBody {
    /// The new user's address
    #[schema(example = "ana@example.com")]
    pub email: String,

    /// The new user's name
    #[schema(example = "Ana")]
    pub name: String,
}

impl TryFrom<WelcomeBody> for Notification {
    type Error = ApiError;

    fn try_from(body: WelcomeBody) -> Result<Self, Self::Error> {
        Ok(Notification::Welcome {
            to: EmailAddress::new(&body.email)?,
            name: body.name,
        })
    }
}

/// Email a welcome message to a new user
#[utoipa::path(
    post,
    operation_id = "send_welcome",
    tag = "Emails",
    path = "/api/v1/emails/welcome",
    request_body = WelcomeBody,
    responses(
        (status = StatusCode::OK, description = "Welcome email sent", body = SendEmailResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse, example = json!({ "error": "Please provide a valid email address" })),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "No provider accepted the email", body = ErrorResponse, example = json!({ "error": "Could not send email, please try again" })),
    )
)]
pub async fn handler<D: DeliveryService, N: NotificationService>(
    State(state): State<AppState<D, N>>,
    request: Result<Json<WelcomeBody>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(request) = request?;

    let notification: Notification = request.try_into()?;

    let result = state.notifications.notify(&notification).await?;

    Ok(Json(result.into()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use testresult::TestResult;

    use crate::{
        domain::communication::{
            mailer::DeliveryResult, notifications::MockNotificationService,
            providers::ProviderIdentity,
        },
        infrastructure::http::{errors::ErrorResponse, router, state::test_state},
    };

    use super::*;

    #[tokio::test]
    async fn test_welcome_success() -> TestResult {
        let mut notifications = MockNotificationService::new();

        notifications
            .expect_notify()
            .withf(|notification| {
                matches!(notification, Notification::Welcome { name, .. } if name == "Ana")
            })
            .times(1)
            .returning(|_| Ok(DeliveryResult::delivered(ProviderIdentity::TencentSes, "m-1")));

        let response = TestServer::new(router(test_state(None, Some(notifications))))?
            .post("/api/v1/emails/welcome")
            .json(&WelcomeBody {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
            })
            .await;

        response.assert_status_ok();
        assert_eq!(
            response.json::<SendEmailResponse>().provider.as_deref(),
            Some("tencent")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_welcome_with_empty_email() -> TestResult {
        let response = TestServer::new(router(test_state(None, None)))?
            .post("/api/v1/emails/welcome")
            .json(&WelcomeBody {
                email: String::new(),
                name: "Ana".to_string(),
            })
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.json::<ErrorResponse>().error,
            "Please provide an email address"
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_welcome_with_malformed_json() -> TestResult {
        let response = TestServer::new(router(test_state(None, None)))?
            .post("/api/v1/emails/welcome")
            .json(&serde_json::json!({ "email": "ana@example.com" }))
            .expect_failure()
            .await;

        assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        Ok(())
    }
}
