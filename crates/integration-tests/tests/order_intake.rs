//! Order intake over real HTTP.

#![allow(clippy::unwrap_used)]

use door_renaissance_core::OrderStatus;
use door_renaissance_integration_tests::{TestContext, order_body};
use serde_json::{Value, json};

#[tokio::test]
async fn test_order_accepted_and_stored() {
    let ctx = TestContext::new().await;

    let response = ctx.post_json("/api/orders", &order_body("+79991234567")).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    assert_eq!(response.json::<Value>().await.unwrap(), json!({"ok": true}));

    let orders = ctx.store.orders().await;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.contact.phone, "+79991234567");
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.ip, "127.0.0.1");
}

#[tokio::test]
async fn test_forwarded_address_is_recorded() {
    let ctx = TestContext::new().await;

    let response = ctx
        .client
        .post(ctx.url("/api/orders"))
        .header("x-forwarded-for", "198.51.100.4, 10.0.0.1")
        .json(&order_body("+79991234567"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(ctx.store.orders().await[0].ip, "198.51.100.4");
}

#[tokio::test]
async fn test_honeypot_rejected_without_side_effects() {
    let ctx = TestContext::new().await;
    let mut body = order_body("+79991234567");
    body["hp"] = json!("1");

    let response = ctx.post_json("/api/orders", &body).await;

    assert_eq!(response.status(), 400);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"ok": false, "code": "bot_hp"})
    );
    assert!(ctx.store.orders().await.is_empty());
    assert_eq!(ctx.store.bucket_count().await, 0);
}

#[tokio::test]
async fn test_validation_codes() {
    let ctx = TestContext::new().await;
    let cases = [
        ("name", json!("И"), "bad_name"),
        ("phone", json!("12"), "bad_phone"),
        ("email", json!("not-an-email"), "bad_email"),
        ("items", json!([]), "bad_items"),
    ];

    for (field, value, code) in cases {
        let mut body = order_body("+79991234567");
        body[field] = value;
        let response = ctx.post_json("/api/orders", &body).await;
        assert_eq!(response.status(), 400, "{field}");
        assert_eq!(
            response.json::<Value>().await.unwrap(),
            json!({"ok": false, "code": code})
        );
    }
    assert!(ctx.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_phone_throttled_after_three_orders() {
    let ctx = TestContext::new().await;

    for _ in 0..3 {
        let response = ctx.post_json("/api/orders", &order_body("+79990000001")).await;
        assert_eq!(response.status(), 200);
    }

    let response = ctx.post_json("/api/orders", &order_body("+79990000001")).await;
    assert_eq!(response.status(), 429);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"ok": false, "code": "rate_limited"})
    );

    let response = ctx.post_json("/api/orders", &order_body("+79990000002")).await;
    assert_eq!(response.status(), 200);
    assert_eq!(ctx.store.orders().await.len(), 4);
}

#[tokio::test]
async fn test_address_throttled_after_ten_orders() {
    let ctx = TestContext::new().await;

    for i in 0..10 {
        let phone = format!("+7999000{i:04}");
        let response = ctx.post_json("/api/orders", &order_body(&phone)).await;
        assert_eq!(response.status(), 200);
    }

    let response = ctx.post_json("/api/orders", &order_body("+79995550000")).await;
    assert_eq!(response.status(), 429);
    assert_eq!(ctx.store.orders().await.len(), 10);
}

#[tokio::test]
async fn test_store_outage_is_server_error() {
    let ctx = TestContext::new().await;
    ctx.store.set_unavailable(true);

    let response = ctx.post_json("/api/orders", &order_body("+79991234567")).await;

    assert_eq!(response.status(), 500);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"ok": false, "code": "server_error"})
    );
}
