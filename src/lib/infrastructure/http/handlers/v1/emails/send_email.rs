//! Send an arbitrary email

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    domain::communication::{
        delivery::DeliveryService,
        email_addresses::EmailAddress,
        mailer::{Attachment, Message},
        notifications::NotificationService,
    },
    infrastructure::http::{
        errors::{ApiError, COULD_NOT_SEND_EMAIL},
        handlers::v1::emails::SendEmailResponse,
        state::AppState,
    },
};

/// A file to attach
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AttachmentBody {
    /// The file name shown to recipients
    #[schema(example = "invoice.pdf")]
    pub filename: String,

    /// The base64 encoded file content
    #[schema(example = "JVBERi0xLjQK")]
    pub content: String,

    /// The MIME type of the file
    #[schema(example = "application/pdf")]
    pub content_type: String,
}

/// Send email request body
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SendEmailBody {
    /// The recipients
    #[schema(example = json!(["ana@example.com"]))]
    pub to: Vec<String>,

    /// The sender, the configured default when omitted
    #[schema(example = "news@mail.example.com")]
    pub from: Option<String>,

    /// The reply-to address
    pub reply_to: Option<String>,

    /// The subject line
    #[schema(example = "Our spring collection is here")]
    pub subject: String,

    /// The HTML body
    pub html: Option<String>,

    /// The plain text body
    pub text: Option<String>,

    /// Files to attach
    #[serde(default)]
    pub attachments: Vec<AttachmentBody>,
}

fn optional_address(raw: Option<&str>) -> Result<Option<EmailAddress>, ApiError> {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => Ok(Some(EmailAddress::new(raw)?)),
        _ => Ok(None),
    }
}

impl TryFrom<SendEmailBody> for Message {
    type Error = ApiError;

    fn try_from(body: SendEmailBody) -> Result<Self, Self::Error> {
        let to = body
            .to
            .iter()
            .map(|raw| EmailAddress::new(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut message = Message::new(to, body.subject);

        message.from = optional_address(body.from.as_deref())?;
        message.reply_to = optional_address(body.reply_to.as_deref())?;
        message.html_body = body.html;
        message.text_body = body.text;

        for attachment in body.attachments {
            let content = STANDARD.decode(attachment.content.trim()).map_err(|_| {
                ApiError::new_422(&format!(
                    "Attachment \"{}\" is not valid base64",
                    attachment.filename
                ))
            })?;

            message = message.with_attachment(Attachment {
                filename: attachment.filename,
                content,
                content_type: attachment.content_type,
            });
        }

        message.validate()?;

        Ok(message)
    }
}

/// Send an email through the configured providers
#[utoipa::path(
    post,
    operation_id = "send_email",
    tag = "Emails",
    path = "/api/v1/emails",
    request_body = SendEmailBody,
    responses(
        (status = StatusCode::OK, description = "Email accepted by a provider", body = SendEmailResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Invalid email", body = ErrorResponse, example = json!({ "error": "Please provide at least one recipient" })),
        (status = StatusCode::INTERNAL_SERVER_ERROR, description = "No provider accepted the email", body = ErrorResponse, example = json!({ "error": "Could not send email, please try again" })),
    )
)]
pub async fn handler<D: DeliveryService, N: NotificationService>(
    State(state): State<AppState<D, N>>,
    request: Result<Json<SendEmailBody>, JsonRejection>,
) -> Result<Json<SendEmailResponse>, ApiError> {
    let Json(request) = request?;

    let message: Message = request.try_into()?;

    let result = state.deliveries.deliver(&message).await;

    if !result.success {
        return Err(ApiError::new_500(COULD_NOT_SEND_EMAIL));
    }

    info!(provider = ?result.provider, message_id = ?result.message_id, "email sent");

    Ok(Json(result.into()))
}
