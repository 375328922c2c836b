use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::{
    domain::communication::{delivery::DeliveryService, notifications::NotificationService},
    infrastructure::http::{open_api::ApiDocs, state::AppState},
};

pub mod emails;
pub mod health;
pub mod stoplight;
pub mod uptime;

pub fn router<D: DeliveryService, N: NotificationService>() -> Router<AppState<D, N>> {
    Router::new()
        .route("/", get(stoplight::handler))
        .route("/openapi.json", get(Json(ApiDocs::openapi())))
        .route("/uptime", get(uptime::handler::<D, N>))
        .route("/health/email", get(health::handler::<D, N>))
        .route("/emails", post(emails::send_email::handler::<D, N>))
        .route(
            "/emails/verification-code",
            post(emails::verification_code::handler::<D, N>),
        )
        .route("/emails/welcome", post(emails::welcome::handler::<D, N>))
        .route(
            "/emails/password-reset",
            post(emails::password_reset::handler::<D, N>),
        )
}
