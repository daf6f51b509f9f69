//! Telegram Bot API client and order summaries.
//!
//! Summaries are rendered in Telegram's legacy `Markdown` parse mode.

use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use door_renaissance_core::order::is_truthy;
use door_renaissance_core::{OrderItem, coerce_amount, format_ru};

use crate::config::TelegramConfig;

/// Errors from the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Request could not be sent. The URL is stripped, it carries the token.
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("telegram {status}: {description}")]
    Api { status: u16, description: String },
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client bound to one chat.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    bot_token: SecretString,
    chat_id: String,
    api_base: Url,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new Telegram client.
    #[must_use]
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            client: Client::new(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            api_base: config.api_base.clone(),
        }
    }

    /// Post a Markdown message to the configured chat.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API responds with a
    /// non-success status.
    #[instrument(skip(self, text), fields(chat_id = %self.chat_id))]
    pub async fn send_message(&self, text: &str) -> Result<(), TelegramError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base.as_str().trim_end_matches('/'),
            self.bot_token.expose_secret()
        );

        let response = self
            .client
            .post(url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;

        let status = response.status();
        if !status.is_success() {
            let description = response
                .json::<ApiResponse>()
                .await
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_else(|| "unknown error".to_string());
            error!(status = status.as_u16(), %description, "Telegram API error");
            return Err(TelegramError::Api {
                status: status.as_u16(),
                description,
            });
        }

        debug!("Message sent to Telegram");
        Ok(())
    }
}

/// One line of an order summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
}

/// A human-readable order notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub lines: Vec<SummaryLine>,
    pub total: Decimal,
}

impl OrderSummary {
    /// Build a summary from a `{contact, order, total}` body.
    ///
    /// Returns `None` when `contact` is missing or falsy, or `order` is not
    /// an array. Non-object lines are skipped.
    #[must_use]
    pub fn from_request(body: &Value) -> Option<Self> {
        let contact = body.get("contact").filter(|c| is_truthy(c))?;
        let Some(Value::Array(order)) = body.get("order") else {
            return None;
        };

        let lines = order
            .iter()
            .filter(|line| line.is_object())
            .cloned()
            .map(OrderItem::from_value)
            .map(|item| SummaryLine {
                name: item.name().unwrap_or_default(),
                quantity: item.quantity(),
                price: item.price(),
            })
            .collect();

        Some(Self {
            name: text_field(contact, "name"),
            phone: text_field(contact, "phone"),
            email: contact
                .get("email")
                .filter(|e| is_truthy(e))
                .map(|_| text_field(contact, "email")),
            lines,
            total: body.get("total").map_or(Decimal::ZERO, coerce_amount),
        })
    }

    /// Render the Markdown message text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::from("📦 *Новый заказ* 📦\n");
        text.push_str(&format!("*Клиент:* {}\n", self.name));
        text.push_str(&format!("*Телефон:* {}\n", self.phone));
        if let Some(email) = &self.email {
            text.push_str(&format!("*Email:* {email}\n"));
        }
        text.push_str("\n*Товары:*\n");
        for line in &self.lines {
            text.push_str(&format!(
                "• {} × {} — {}₽\n",
                line.name,
                line.quantity,
                format_ru(line.price)
            ));
        }
        text.push_str(&format!("\n*Итого:* {}₽", format_ru(self.total)));
        text
    }
}

/// String form of a scalar contact field; anything else renders empty.
fn text_field(contact: &Value, key: &str) -> String {
    match contact.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}
