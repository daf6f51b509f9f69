//! Order intake pipeline.
//!
//! A single pass over: validation, per-address and per-phone rate limits,
//! bot screening, persistence. Nothing is written to the order store unless
//! every step passes. Rate-limit counters are not rolled back when a later
//! step fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use door_renaissance_core::{Order, OrderSubmission, validate};

use super::rate_limit::RateLimiter;
use super::recaptcha::{ORDER_ACTION, RecaptchaClient};
use crate::config::OrderRateLimits;
use crate::db::OrderStore;
use crate::error::{OrderError, add_breadcrumb};

/// Orchestrates order submissions.
#[derive(Clone)]
pub struct OrderIntake {
    orders: Arc<dyn OrderStore>,
    limiter: RateLimiter,
    recaptcha: RecaptchaClient,
    limits: OrderRateLimits,
}

impl OrderIntake {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderStore>,
        limiter: RateLimiter,
        recaptcha: RecaptchaClient,
        limits: OrderRateLimits,
    ) -> Self {
        Self {
            orders,
            limiter,
            recaptcha,
            limits,
        }
    }

    /// Run a submission from `ip` through the pipeline and persist it.
    ///
    /// # Errors
    ///
    /// Returns the first failing step as an `OrderError`; its
    /// [`OrderError::code`] is what the client sees.
    #[instrument(skip(self, submission))]
    pub async fn submit(
        &self,
        submission: &OrderSubmission,
        ip: &str,
    ) -> Result<Order, OrderError> {
        let valid = validate(submission)?;

        // Both limits are consulted (and charged) before either verdict is used.
        let ip_ok = self
            .limiter
            .admit(&format!("ip:{ip}"), self.limits.per_ip)
            .await?;
        let phone_ok = self
            .limiter
            .admit(&format!("phone:{}", valid.contact.phone), self.limits.per_phone)
            .await?;
        if !ip_ok || !phone_ok {
            return Err(OrderError::RateLimited);
        }

        let verdict = self
            .recaptcha
            .verify(submission.recaptcha_token.as_deref(), ORDER_ACTION)
            .await?;
        if !verdict.ok {
            return Err(OrderError::Recaptcha {
                score: verdict.score,
            });
        }

        let order = Order::new(
            valid.contact,
            valid.items,
            valid.total,
            ip.to_string(),
            Utc::now(),
        );
        self.orders.insert(&order).await?;

        info!(order_id = %order.id, items = order.items.len(), "Order accepted");
        add_breadcrumb(
            "order",
            "Order accepted",
            Some(&[("order_id", &order.id.to_string())]),
        );
        Ok(order)
    }
}
