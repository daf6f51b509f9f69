//! Best-effort relay of accepted orders to the notification endpoint.
//!
//! The relay never fails: every problem is folded into a [`RelayOutcome`]
//! and logged. Nothing is retried.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;

use door_renaissance_core::{Contact, Order, OrderItem, amount_to_json};

/// Upper bound on one relay request; the order response waits for it.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to a relay attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The endpoint acknowledged the notification.
    Delivered,
    /// No endpoint is configured.
    Skipped,
    /// The endpoint answered with something other than JSON.
    NotJson { status: u16 },
    /// Network failure, or the endpoint reported an error.
    Failed { status: Option<u16>, error: String },
}

/// Body posted to the endpoint: `{contact, order, total}`.
#[derive(Debug, Serialize)]
pub struct RelayPayload<'a> {
    pub contact: &'a Contact,
    pub order: &'a [OrderItem],
    pub total: Value,
}

impl<'a> From<&'a Order> for RelayPayload<'a> {
    fn from(order: &'a Order) -> Self {
        Self {
            contact: &order.contact,
            order: &order.items,
            total: amount_to_json(order.total),
        }
    }
}

#[derive(Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<Value>,
}

/// Relay client.
#[derive(Debug, Clone)]
pub struct NotificationRelay {
    client: Client,
    url: Option<Url>,
}

impl NotificationRelay {
    #[must_use]
    pub fn new(url: Option<Url>) -> Self {
        Self::with_timeout(url, RELAY_TIMEOUT)
    }

    /// Relay whose requests give up after `timeout`.
    #[must_use]
    pub fn with_timeout(url: Option<Url>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, url }
    }

    /// Post an order summary request to the endpoint.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn notify(&self, order: &Order) -> RelayOutcome {
        let Some(url) = &self.url else {
            warn!("Order relay skipped: no endpoint configured");
            return RelayOutcome::Skipped;
        };

        let outcome = self.send(url.clone(), &RelayPayload::from(order)).await;
        match &outcome {
            RelayOutcome::Delivered => info!("Order relayed"),
            other => warn!(outcome = ?other, "Order relay failed"),
        }
        outcome
    }

    async fn send(&self, url: Url, payload: &RelayPayload<'_>) -> RelayOutcome {
        let response = match self.client.post(url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                return RelayOutcome::Failed {
                    status: None,
                    error: e.to_string(),
                };
            }
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"));
        if !is_json {
            return RelayOutcome::NotJson {
                status: status.as_u16(),
            };
        }

        match response.json::<Acknowledgement>().await {
            Ok(ack) if status.is_success() && ack.success => RelayOutcome::Delivered,
            Ok(ack) => RelayOutcome::Failed {
                status: Some(status.as_u16()),
                error: ack
                    .error
                    .filter(|e| !e.is_null())
                    .map_or_else(|| "tg_failed".to_string(), |e| match e {
                        Value::String(s) => s,
                        other => other.to_string(),
                    }),
            },
            Err(e) => RelayOutcome::Failed {
                status: Some(status.as_u16()),
                error: e.to_string(),
            },
        }
    }
}
