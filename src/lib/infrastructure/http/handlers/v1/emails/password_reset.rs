//! Send a password reset link

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

/// Password reset request body
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PasswordResetBody {
    /// The account's address
    #[schema(example = "ana@example.com")]
    pub email: String,

    /// The link to the reset form
    #[schema(example = "https://app.example.com/reset?token=3f1c9a")]
    pub reset_link: String,

    /// The recipient's name
    #[schema(example = "Ana")]
    pub name: Option<String>,
}

impl TryFrom<PasswordResetBody> for Notification {
    type Error = ApiError;

    fn try_from(body: PasswordResetBody) -> Result<Self, Self::Error> {
        let reset_link = body.reset_link.trim();

        if reset_link.is_empty() {
            return Err(ApiError::new_422("Please provide a reset link"));
        }

        Ok(Notification::PasswordReset {
            to: EmailAddress::new(&body.email)?,
            reset_link: reset_link.to_string(),
            name: body.name,
        })
    }
}

/// Email a password reset link
#[utoipa::path(
    post,
    operation_id = "send_password_reset",
    tag = "Emails",
    path = "/api/v1/emails/password-reset",
    request_body = PasswordResetBody,
    responses(
        (status = StatusCode::OK, description = "Password reset email sent", body = SendEmailResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse, example = json!({ "error": "Please provide a reset link" })),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "No provider accepted the email", body = ErrorResponse, example = json!({ "error": "Could not send email, please try again" })),
    )
)]
pub async fn handler<D: DeliveryService, N: NotificationService>(
    State(state): State<AppState<D, N>>,
    request: Result<Json<PasswordResetBody>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(request) = request?;

    let notification: Notification = request.try_into()?;

    let result = state.notifications.notify(&notification).await?;

    Ok(Json(result.into()))
}
