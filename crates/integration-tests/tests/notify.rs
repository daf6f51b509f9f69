//! Telegram notify endpoint and the order relay that feeds it.

#![allow(clippy::unwrap_used)]

use door_renaissance_core::{coerce_amount, format_ru};
use door_renaissance_integration_tests::{
    MISSING_CHAT, Options, TestContext, order_body,
};
use serde_json::{Value, json};

fn rub(amount: &Value) -> String {
    format!("{}₽", format_ru(coerce_amount(amount)))
}

#[tokio::test]
async fn test_notify_sends_formatted_message() {
    let ctx = TestContext::new().await;
    let body = json!({
        "contact": {"name": "Анна", "phone": "+79990001122"},
        "order": [{"name": "Дверь", "quantity": 1, "price": 12500}, "junk"],
        "total": 12500
    });

    let response = ctx.post_json("/api/notify", &body).await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"success": true}));

    let inbox = ctx.telegram.lock().await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["chat_id"], "-100200300");
    assert_eq!(inbox[0]["parse_mode"], "Markdown");

    let text = inbox[0]["text"].as_str().unwrap();
    assert!(text.starts_with("📦 *Новый заказ* 📦\n*Клиент:* Анна\n*Телефон:* +79990001122\n"));
    assert!(!text.contains("*Email:*"));
    assert!(text.contains(&format!("• Дверь × 1 — {}\n", rub(&json!(12500)))));
    assert!(text.ends_with(&format!("*Итого:* {}", rub(&json!(12500)))));
}

#[tokio::test]
async fn test_notify_rejects_malformed_body() {
    let ctx = TestContext::new().await;

    for body in [
        json!({"order": [], "total": 0}),
        json!({"contact": {"name": "Анна"}, "order": "none"}),
    ] {
        let response = ctx.post_json("/api/notify", &body).await;
        assert_eq!(response.status(), 400);
        assert_eq!(
            response.json::<Value>().await.unwrap(),
            json!({"error": "Bad request"})
        );
    }
    assert!(ctx.telegram.lock().await.is_empty());
}

#[tokio::test]
async fn test_notify_without_bot() {
    let ctx = TestContext::with_options(Options {
        chat_id: None,
        ..Options::default()
    })
    .await;
    let body = json!({"contact": {"name": "Анна"}, "order": []});

    let response = ctx.post_json("/api/notify", &body).await;

    assert_eq!(response.status(), 503);
    assert!(response.json::<Value>().await.unwrap()["error"].is_string());
}

#[tokio::test]
async fn test_notify_surfaces_telegram_error() {
    let ctx = TestContext::with_options(Options {
        chat_id: Some(MISSING_CHAT.to_string()),
        ..Options::default()
    })
    .await;
    let body = json!({"contact": {"name": "Анна"}, "order": []});

    let response = ctx.post_json("/api/notify", &body).await;

    assert_eq!(response.status(), 500);
    let error = response.json::<Value>().await.unwrap()["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(error.contains("chat not found"));
}

#[tokio::test]
async fn test_accepted_order_is_relayed_to_telegram() {
    let ctx = TestContext::with_options(Options {
        relay_to_self: true,
        ..Options::default()
    })
    .await;

    let response = ctx.post_json("/api/orders", &order_body("+79991234567")).await;
    assert_eq!(response.status(), 200);

    let inbox = ctx.telegram.lock().await;
    assert_eq!(inbox.len(), 1);
    let text = inbox[0]["text"].as_str().unwrap();
    assert!(text.contains("*Клиент:* Иван Петров\n"));
    assert!(text.contains("*Email:* ivan@example.ru\n"));
    assert!(text.contains(&format!("• Дверь Дуб × 2 — {}\n", rub(&json!(15000)))));
    assert!(text.contains(&format!("• Ламинат × 3 — {}\n", rub(&json!("1200.50")))));
    assert!(text.ends_with(&format!("*Итого:* {}", rub(&json!(33601.5)))));
}

#[tokio::test]
async fn test_relay_failure_does_not_fail_order() {
    let ctx = TestContext::with_options(Options {
        chat_id: Some(MISSING_CHAT.to_string()),
        relay_to_self: true,
        ..Options::default()
    })
    .await;

    let response = ctx.post_json("/api/orders", &order_body("+79991234567")).await;

    assert_eq!(response.status(), 200);
    assert_eq!(ctx.store.orders().await.len(), 1);
    assert!(ctx.telegram.lock().await.is_empty());
}
