//! reCAPTCHA screening of order submissions.

#![allow(clippy::unwrap_used)]

use door_renaissance_integration_tests::{
    HUMAN_TOKEN, LOW_SCORE_TOKEN, Options, RECAPTCHA_SECRET, Screening, TestContext,
    WRONG_ACTION_TOKEN, order_body,
};
use serde_json::{Value, json};

async fn screened() -> TestContext {
    TestContext::with_options(Options {
        screening: Screening::Fake,
        ..Options::default()
    })
    .await
}

fn body_with_token(phone: &str, token: &str) -> Value {
    let mut body = order_body(phone);
    body["recaptchaToken"] = json!(token);
    body
}

#[tokio::test]
async fn test_human_token_is_accepted() {
    let ctx = screened().await;

    let response = ctx
        .post_json("/api/orders", &body_with_token("+79991234567", HUMAN_TOKEN))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(ctx.store.orders().await.len(), 1);

    let verifications = ctx.verifications.lock().await;
    assert_eq!(verifications.len(), 1);
    assert_eq!(verifications[0]["secret"], RECAPTCHA_SECRET);
    assert_eq!(verifications[0]["response"], HUMAN_TOKEN);
}

#[tokio::test]
async fn test_low_score_and_wrong_action_are_rejected() {
    let ctx = screened().await;

    for token in [LOW_SCORE_TOKEN, WRONG_ACTION_TOKEN, "forged"] {
        let response = ctx
            .post_json("/api/orders", &body_with_token("+79991234567", token))
            .await;

        assert_eq!(response.status(), 403, "{token}");
        assert_eq!(
            response.json::<Value>().await.unwrap(),
            json!({"ok": false, "code": "recaptcha"})
        );
    }
    assert!(ctx.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_rejected_submissions_still_count_against_limits() {
    let ctx = screened().await;

    for _ in 0..3 {
        let response = ctx
            .post_json("/api/orders", &body_with_token("+79990000001", LOW_SCORE_TOKEN))
            .await;
        assert_eq!(response.status(), 403);
    }

    let response = ctx
        .post_json("/api/orders", &body_with_token("+79990000001", HUMAN_TOKEN))
        .await;
    assert_eq!(response.status(), 429);
    assert!(ctx.store.orders().await.is_empty());
}

#[tokio::test]
async fn test_missing_token_skips_verification() {
    let ctx = screened().await;
    let mut body = order_body("+79991234567");
    body["recaptchaToken"] = json!("");

    let response = ctx.post_json("/api/orders", &body).await;

    assert_eq!(response.status(), 200);
    assert!(ctx.verifications.lock().await.is_empty());
}

#[tokio::test]
async fn test_numeric_token_is_verified() {
    let ctx = screened().await;
    let mut body = order_body("+79991234567");
    body["recaptchaToken"] = json!(12345);

    let response = ctx.post_json("/api/orders", &body).await;

    assert_eq!(response.status(), 403);
    assert_eq!(ctx.verifications.lock().await[0]["response"], "12345");
}

#[tokio::test]
async fn test_unreachable_service_is_server_error() {
    let ctx = TestContext::with_options(Options {
        screening: Screening::Unreachable,
        ..Options::default()
    })
    .await;

    let response = ctx
        .post_json("/api/orders", &body_with_token("+79991234567", HUMAN_TOKEN))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(
        response.json::<Value>().await.unwrap(),
        json!({"ok": false, "code": "server_error"})
    );
    assert!(ctx.store.orders().await.is_empty());
    assert_eq!(ctx.store.bucket_count().await, 2);
}
