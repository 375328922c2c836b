//! Application state module

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    domain::communication::{delivery::DeliveryService, notifications::NotificationService},
    infrastructure::email::config::ProviderHealth,
};

/// Global application state
#[derive(Clone)]
pub struct AppState<D: DeliveryService, N: NotificationService> {
    /// The time the server started
    pub start_time: DateTime<Utc>,

    /// Provider configuration health, captured at startup
    pub email_health: Arc<Vec<ProviderHealth>>,

    /// Delivery service
    pub deliveries: Arc<D>,

    /// Notification service
    pub notifications: Arc<N>,
}

impl<D, N> AppState<D, N>
where
    D: DeliveryService,
    N: NotificationService,
{
    /// Create a new application state
    pub fn new(email_health: Vec<ProviderHealth>, deliveries: D, notifications: N) -> Self {
        Self {
            start_time: Utc::now(),
            email_health: Arc::new(email_health),
            deliveries: Arc::new(deliveries),
            notifications: Arc::new(notifications),
        }
    }
}

impl<D, N> fmt::Debug for AppState<D, N>
where
    D: DeliveryService,
    N: NotificationService,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("start_time", &self.start_time)
            .field("email_health", &self.email_health)
            .field("deliveries", &"DeliveryService")
            .field("notifications", &"NotificationService")
            .finish()
    }
}

#[cfg(test)]
use crate::domain::communication::{
    delivery::MockDeliveryService, notifications::MockNotificationService,
    providers::ProviderIdentity,
};

#[cfg(test)]
pub fn test_state(
    deliveries: Option<MockDeliveryService>,
    notifications: Option<MockNotificationService>,
) -> AppState<MockDeliveryService, MockNotificationService> {
    let email_health = ProviderIdentity::ALL
        .into_iter()
        .map(|provider| ProviderHealth {
            provider,
            primary: provider == ProviderIdentity::AliyunDirectMail,
            configured: provider != ProviderIdentity::TencentSes,
            missing: match provider {
                ProviderIdentity::TencentSes => vec!["TENCENT_SECRET_KEY".to_string()],
                _ => Vec::new(),
            },
        })
        .collect();

    AppState::new(
        email_health,
        deliveries.unwrap_or_default(),
        notifications.unwrap_or_default(),
    )
}
