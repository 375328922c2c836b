#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! REST API for sending email

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use outbound_mail::{
    domain::communication::{
        delivery::DeliveryServiceImpl, notifications::NotificationServiceImpl,
    },
    infrastructure::{
        email::{config::MailConfig, registry::ProviderRegistry},
        http::{AppState, HttpServer, HttpServerConfig},
    },
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The HTTP server configuration
    #[clap(flatten)]
    pub server: HttpServerConfig,

    /// The mail provider configuration
    #[clap(flatten)]
    pub mail: MailConfig,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load environment: {}", e);

            return Err(e.into());
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let email_health = args.mail.health();

    for health in &email_health {
        if health.configured {
            info!(provider = %health.provider, primary = health.primary, "email provider configured");
        } else {
            warn!(
                provider = %health.provider,
                primary = health.primary,
                missing = %health.missing.join(", "),
                "email provider is not fully configured"
            );
        }
    }

    let registry = Arc::new(ProviderRegistry::new(&args.mail)?);

    let deliveries = DeliveryServiceImpl::new(
        registry,
        args.mail.provider,
        args.mail.default_sender.clone(),
    )
    .with_attempt_timeout(args.mail.send_timeout());

    let notifications = NotificationServiceImpl::new(Arc::new(deliveries.clone()));

    let state = AppState::new(email_health, deliveries, notifications);

    HttpServer::new(state, args.server)?.run().await
}
