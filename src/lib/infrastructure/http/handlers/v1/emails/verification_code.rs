//! Send a verification code

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

/// Verification code request body
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationCodeBody {
    /// The address to verify
    #[schema(example = "ana@example.com")]
    pub email: String,

    /// The code the recipient must enter
    #[schema(example = "482913")]
    pub code: String,

    /// The recipient's name
    #[schema(example = "Ana")]
    pub name: Option<String>,
}

impl TryFrom<VerificationCodeBody> for Notification {
    type Error = ApiError;

    fn try_from(body: VerificationCodeBody) -> Result<Self, Self::Error> {
        let code = body.code.trim();

        if code.is_empty() {
            return Err(ApiError::new_422("Please provide a verification code"));
        }

        Ok(Notification::VerificationCode {
            to: EmailAddress::new(&body.email)?,
            code: code.to_string(),
            name: body.name,
        })
    }
}

/// Email a verification code
#[utoipa::path(
    post,
    operation_id = "send_verification_code",
    tag = "Emails",
    path = "/api/v1/emails/verification-code",
    request_body = VerificationCodeBody,
    responses(
        (status = StatusCode::OK, description = "Verification code sent", body = SendEmailResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse, example = json!({ "error": "Please provide a valid email address" })),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "No provider accepted the email", body = ErrorResponse, example = json!({ "error": "Could not send email, please try again" })),
    )
)]
pub async fn handler<D: DeliveryService, N: NotificationService>(
    State(state): State<AppState<D, N>>,
    request: Result<Json<VerificationCodeBody>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(request) = request?;

    let notification: Notification = request.try_into()?;

    let result = state.notifications.notify(&notification).await?;

    Ok(Json(result.into()))
}
