//! Integration tests for Door Renaissance.
//!
//! Each test spawns the full storefront router on an ephemeral port, backed
//! by the in-memory store, next to a fake Telegram Bot API and a fake
//! reCAPTCHA `siteverify` endpoint that record what they are sent. No
//! database or network access is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p door-renaissance-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Form, Json, Router, extract::State, http::StatusCode, routing::post};
use reqwest::Client;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use url::Url;

use door_renaissance_storefront::config::{
    OrderRateLimits, RecaptchaConfig, StorefrontConfig, TelegramConfig,
};
use door_renaissance_storefront::db::{MemoryStore, Stores};
use door_renaissance_storefront::state::AppState;

/// Bot token the fake Telegram API accepts.
pub const BOT_TOKEN: &str = "123456-integration";

/// Chat id the fake Telegram API answers with "chat not found".
pub const MISSING_CHAT: &str = "missing";

/// Server secret the fake `siteverify` endpoint accepts.
pub const RECAPTCHA_SECRET: &str = "6LdTestSecret-integration";

/// Tokens the fake `siteverify` endpoint scores as a human.
pub const HUMAN_TOKEN: &str = "human";

/// Tokens scored below the acceptance threshold.
pub const LOW_SCORE_TOKEN: &str = "bot";

/// Tokens issued for some other action than placing an order.
pub const WRONG_ACTION_TOKEN: &str = "login-form";

/// Messages received by the fake Telegram API.
pub type Inbox = Arc<Mutex<Vec<Value>>>;

/// Form bodies received by the fake `siteverify` endpoint.
pub type Verifications = Arc<Mutex<Vec<HashMap<String, String>>>>;

/// Where order screening sends its tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
    /// No secret configured; every submission passes.
    Disabled,
    /// The fake `siteverify` endpoint.
    Fake,
    /// A port nothing listens on.
    Unreachable,
}

/// How the storefront under test is wired.
#[derive(Debug, Clone)]
pub struct Options {
    /// Telegram chat id; `None` leaves the bot unconfigured.
    pub chat_id: Option<String>,
    /// Relay accepted orders to the storefront's own notify endpoint.
    pub relay_to_self: bool,
    pub screening: Screening,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chat_id: Some("-100200300".to_string()),
            relay_to_self: false,
            screening: Screening::Disabled,
        }
    }
}

/// A running storefront plus its fake Telegram.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub store: MemoryStore,
    pub telegram: Inbox,
    pub verifications: Verifications,
}

impl TestContext {
    /// Start with the default options.
    pub async fn new() -> Self {
        Self::with_options(Options::default()).await
    }

    /// Start a storefront and a fake Telegram wired per `options`.
    ///
    /// # Panics
    ///
    /// Panics if a listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn with_options(options: Options) -> Self {
        let (telegram_addr, telegram) = spawn_fake_telegram().await;
        let (siteverify_addr, verifications) = spawn_fake_siteverify().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront listener");
        let addr = listener.local_addr().expect("storefront address");
        let base_url = format!("http://{addr}");

        let telegram_config = options.chat_id.map(|chat_id| TelegramConfig {
            bot_token: SecretString::from(BOT_TOKEN),
            chat_id,
            api_base: Url::parse(&format!("http://{telegram_addr}")).expect("telegram url"),
        });
        let notify_url = options
            .relay_to_self
            .then(|| Url::parse(&format!("{base_url}/api/notify")).expect("notify url"));

        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/unused"),
            host: addr.ip(),
            port: addr.port(),
            recaptcha: recaptcha_config(options.screening, siteverify_addr).await,
            telegram: telegram_config,
            notify_url,
            rate_limits: OrderRateLimits::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };

        let store = MemoryStore::new();
        let app = door_renaissance_storefront::app(AppState::new(
            config,
            Stores::memory(&store),
        ));
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await;
        });

        Self {
            client: Client::new(),
            base_url,
            store,
            telegram,
            verifications,
        }
    }

    /// Absolute URL for a path on the storefront.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POST a JSON body to the storefront.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    #[allow(clippy::expect_used)]
    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("request failed")
    }
}

/// A well-formed order for `phone`.
#[must_use]
pub fn order_body(phone: &str) -> Value {
    json!({
        "name": "Иван Петров",
        "phone": phone,
        "email": "ivan@example.ru",
        "items": [
            {"id": "door-oak-01", "name": "Дверь Дуб", "quantity": 2, "price": 15000},
            {"id": "laminate-12", "name": "Ламинат", "quantity": "3", "price": "1200.50"}
        ],
        "total": 33601.5,
        "hp": "",
        "recaptchaToken": "token"
    })
}

#[allow(clippy::expect_used)]
async fn recaptcha_config(screening: Screening, fake: SocketAddr) -> RecaptchaConfig {
    let addr = match screening {
        Screening::Disabled => return RecaptchaConfig::disabled(),
        Screening::Fake => fake,
        Screening::Unreachable => {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind throwaway listener");
            listener.local_addr().expect("throwaway address")
        }
    };
    RecaptchaConfig {
        secret: Some(SecretString::from(RECAPTCHA_SECRET)),
        verify_url: Url::parse(&format!("http://{addr}/recaptcha/api/siteverify"))
            .expect("siteverify url"),
    }
}

async fn siteverify(
    State(verifications): State<Verifications>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<Value> {
    let secret_ok = form.get("secret").map(String::as_str) == Some(RECAPTCHA_SECRET);
    let token = form.get("response").cloned().unwrap_or_default();
    verifications.lock().await.push(form);

    let body = match token.as_str() {
        _ if !secret_ok => json!({"success": false, "error-codes": ["invalid-input-secret"]}),
        HUMAN_TOKEN => json!({"success": true, "score": 0.9, "action": "order"}),
        LOW_SCORE_TOKEN => json!({"success": true, "score": 0.1, "action": "order"}),
        WRONG_ACTION_TOKEN => json!({"success": true, "score": 0.9, "action": "login"}),
        _ => json!({"success": false, "error-codes": ["invalid-input-response"]}),
    };
    Json(body)
}

#[allow(clippy::expect_used)]
async fn spawn_fake_siteverify() -> (SocketAddr, Verifications) {
    let verifications = Verifications::default();
    let router = Router::new()
        .route("/recaptcha/api/siteverify", post(siteverify))
        .with_state(Arc::clone(&verifications));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind siteverify listener");
    let addr = listener.local_addr().expect("siteverify address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (addr, verifications)
}

async fn send_message(State(inbox): State<Inbox>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["chat_id"] == MISSING_CHAT {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"})),
        );
    }
    inbox.lock().await.push(body);
    (StatusCode::OK, Json(json!({"ok": true, "result": {"message_id": 1}})))
}

#[allow(clippy::expect_used)]
async fn spawn_fake_telegram() -> (SocketAddr, Inbox) {
    let inbox = Inbox::default();
    let router = Router::new()
        .route(&format!("/bot{BOT_TOKEN}/sendMessage"), post(send_message))
        .with_state(Arc::clone(&inbox));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind telegram listener");
    let addr = listener.local_addr().expect("telegram address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    (addr, inbox)
}
