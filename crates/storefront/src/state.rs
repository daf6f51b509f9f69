//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::services::{
    Catalog, NotificationRelay, OrderIntake, RateLimiter, RecaptchaClient, TelegramClient,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Everything is built once at
/// startup from the configuration; handlers never read the environment.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    intake: OrderIntake,
    relay: NotificationRelay,
    telegram: Option<TelegramClient>,
    catalog: Catalog,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `stores` - Order, rate-limit and product stores
    #[must_use]
    pub fn new(config: StorefrontConfig, stores: Stores) -> Self {
        let intake = OrderIntake::new(
            Arc::clone(&stores.orders),
            RateLimiter::new(Arc::clone(&stores.rate_limits)),
            RecaptchaClient::new(&config.recaptcha),
            config.rate_limits,
        );
        let relay = NotificationRelay::new(config.notify_url.clone());
        let telegram = config.telegram.as_ref().map(TelegramClient::new);
        let catalog = Catalog::new(Arc::clone(&stores.products));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                intake,
                relay,
                telegram,
                catalog,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get a reference to the order intake pipeline.
    #[must_use]
    pub fn intake(&self) -> &OrderIntake {
        &self.inner.intake
    }

    #[must_use]
    pub fn relay(&self) -> &NotificationRelay {
        &self.inner.relay
    }

    /// Telegram client, if a bot is configured.
    #[must_use]
    pub fn telegram(&self) -> Option<&TelegramClient> {
        self.inner.telegram.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }
}
