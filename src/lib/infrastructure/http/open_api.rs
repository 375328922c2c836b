//! OpenAPI module

use utoipa::OpenApi;

use crate::infrastructure::http::{errors::ErrorResponse, handlers::v1::*};

#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "Outbound Mail"),
    paths(
        emails::send_email::handler,
        emails::verification_code::handler,
        emails::welcome::handler,
        emails::password_reset::handler,
        health::handler,
        uptime::handler
    ),
    components(schemas(
        emails::SendEmailResponse,
        emails::send_email::SendEmailBody,
        emails::send_email::AttachmentBody,
        emails::verification_code::VerificationCodeBody,
        emails::welcome::WelcomeBody,
        emails::password_reset::PasswordResetBody,
        health::EmailHealthResponse,
        health::ProviderHealthResponse,
        uptime::UptimeResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDocs;
