//! Order field validation.
//!
//! Purely local and synchronous: runs before any network call. Checks are
//! ordered honeypot → name → phone → email → items and the first failure
//! wins. Each failure maps to a distinct [`RejectionCode`] so clients can
//! localize the message.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::order::{Contact, OrderItem, OrderSubmission, is_truthy};
use crate::types::{Email, coerce_amount};

/// One or more Latin/Cyrillic words of at least two letters, single-space separated.
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-zА-Яа-яЁё]{2,}(?: [A-Za-zА-Яа-яЁё]{2,})*$").expect("Invalid regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{10,12}$").expect("Invalid regex"));

/// Machine-readable reason an order was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    BadName,
    BadPhone,
    BadEmail,
    BadItems,
    BotHp,
    RateLimited,
    Recaptcha,
    ServerError,
}

impl RejectionCode {
    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadName => "bad_name",
            Self::BadPhone => "bad_phone",
            Self::BadEmail => "bad_email",
            Self::BadItems => "bad_items",
            Self::BotHp => "bot_hp",
            Self::RateLimited => "rate_limited",
            Self::Recaptcha => "recaptcha",
            Self::ServerError => "server_error",
        }
    }
}

impl std::fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("honeypot field was filled in")]
    Honeypot,
    #[error("name must be one or more words of at least two letters")]
    Name,
    #[error("phone must be 10-12 digits with an optional leading +")]
    Phone,
    #[error("invalid email: {0}")]
    Email(String),
    #[error("order must contain at least one item")]
    Items,
}

impl ValidationError {
    /// Rejection code reported to the client.
    #[must_use]
    pub const fn code(&self) -> RejectionCode {
        match self {
            Self::Honeypot => RejectionCode::BotHp,
            Self::Name => RejectionCode::BadName,
            Self::Phone => RejectionCode::BadPhone,
            Self::Email(_) => RejectionCode::BadEmail,
            Self::Items => RejectionCode::BadItems,
        }
    }
}

/// The parts of a submission that survived validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub contact: Contact,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
}

/// Check a name: whole words only, no digits, punctuation or one-letter tokens.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// Check a phone number: optional `+`, then 10 to 12 digits.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

/// Validate a raw submission.
///
/// # Errors
///
/// Returns the first failing check, in the order honeypot, name, phone,
/// email, items.
pub fn validate(submission: &OrderSubmission) -> Result<ValidatedOrder, ValidationError> {
    if is_truthy(&submission.honeypot) {
        return Err(ValidationError::Honeypot);
    }

    let name = submission
        .name
        .as_deref()
        .filter(|n| is_valid_name(n))
        .ok_or(ValidationError::Name)?;

    let phone = submission
        .phone
        .as_deref()
        .filter(|p| is_valid_phone(p))
        .ok_or(ValidationError::Phone)?;

    let email = validate_email(&submission.email)?;
    let items = validate_items(&submission.items)?;

    Ok(ValidatedOrder {
        contact: Contact {
            name: name.to_owned(),
            phone: phone.to_owned(),
            email,
        },
        items,
        total: coerce_amount(&submission.total),
    })
}

/// An absent (falsy) email is fine; anything present must look like one.
fn validate_email(value: &Value) -> Result<Option<Email>, ValidationError> {
    if !is_truthy(value) {
        return Ok(None);
    }
    let Value::String(raw) = value else {
        return Err(ValidationError::Email("not a string".to_owned()));
    };
    Email::parse(raw)
        .map(Some)
        .map_err(|e| ValidationError::Email(e.to_string()))
}

fn validate_items(value: &Value) -> Result<Vec<OrderItem>, ValidationError> {
    let Value::Array(raw) = value else {
        return Err(ValidationError::Items);
    };
    if raw.is_empty() {
        return Err(ValidationError::Items);
    }
    Ok(raw.iter().cloned().map(OrderItem::from_value).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn submission(body: Value) -> OrderSubmission {
        OrderSubmission::from_json(&body)
    }

    fn valid_body() -> Value {
        json!({
            "name": "Иван Петров",
            "phone": "+79991234567",
            "email": "ivan@example.ru",
            "items": [{"id": "door-1", "name": "Дверь", "quantity": 1, "price": 12500}],
            "total": 12500,
            "hp": ""
        })
    }

    fn code_for(body: Value) -> RejectionCode {
        validate(&submission(body)).unwrap_err().code()
    }

    #[test]
    fn test_valid_submission() {
        let order = validate(&submission(valid_body())).unwrap();
        assert_eq!(order.contact.name, "Иван Петров");
        assert_eq!(order.contact.phone, "+79991234567");
        assert_eq!(
            order.contact.email.as_ref().map(Email::as_str),
            Some("ivan@example.ru")
        );
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total, Decimal::from(12500));
    }

    #[test]
    fn test_names() {
        for good in ["Ivan", "Иван Петров", "Anna Maria Smith", "Ёжик Ёлкин", "ab"] {
            assert!(is_valid_name(good), "{good} should be accepted");
        }
        for bad in [
            "",
            "I",
            "Ivan P",
            "Ivan2",
            "R2D2",
            "Ivan-Petrov",
            "Ivan  Petrov",
            " Ivan",
            "Ivan ",
            "Ivan.",
        ] {
            assert!(!is_valid_name(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_phones() {
        for good in ["+79991234567", "89991234567", "1234567890", "+123456789012"] {
            assert!(is_valid_phone(good), "{good} should be accepted");
        }
        for bad in [
            "",
            "123456789",
            "1234567890123",
            "++79991234567",
            "+7 999 123 45 67",
            "+7(999)1234567",
            "7999123456a",
        ] {
            assert!(!is_valid_phone(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_honeypot_wins_over_everything() {
        assert_eq!(code_for(json!({"hp": "1"})), RejectionCode::BotHp);

        let mut body = valid_body();
        body["hp"] = json!("1");
        assert_eq!(code_for(body), RejectionCode::BotHp);
    }

    #[test]
    fn test_field_order() {
        // Everything wrong: name reported first.
        assert_eq!(
            code_for(json!({"name": "X", "phone": "1", "email": "x", "items": []})),
            RejectionCode::BadName
        );

        let mut body = valid_body();
        body["phone"] = json!("12345");
        body["email"] = json!("not-an-email");
        assert_eq!(code_for(body), RejectionCode::BadPhone);

        let mut body = valid_body();
        body["email"] = json!("not-an-email");
        body["items"] = json!([]);
        assert_eq!(code_for(body), RejectionCode::BadEmail);
    }

    #[test]
    fn test_non_string_name_is_bad_name() {
        let mut body = valid_body();
        body["name"] = json!(42);
        assert_eq!(code_for(body), RejectionCode::BadName);
    }

    #[test]
    fn test_empty_email_is_absent() {
        let mut body = valid_body();
        body["email"] = json!("");
        let order = validate(&submission(body)).unwrap();
        assert!(order.contact.email.is_none());
    }

    #[test]
    fn test_non_string_email_is_bad_email() {
        let mut body = valid_body();
        body["email"] = json!(5);
        assert_eq!(code_for(body), RejectionCode::BadEmail);
    }

    #[test]
    fn test_items_keep_entries_verbatim() {
        let mut body = valid_body();
        body["items"] = json!([1, "door", {"id": "door-1", "color": "oak"}]);
        let order = validate(&submission(body)).unwrap();

        let stored: Vec<Value> = order
            .items
            .iter()
            .map(|i| serde_json::to_value(i).unwrap())
            .collect();
        assert_eq!(stored, vec![json!(1), json!("door"), json!({"id": "door-1", "color": "oak"})]);
    }

    #[test]
    fn test_items() {
        for items in [json!([]), json!(null), json!("door"), json!({"0": {}})] {
            let mut body = valid_body();
            body["items"] = items;
            assert_eq!(code_for(body), RejectionCode::BadItems);
        }
    }

    #[test]
    fn test_rejection_codes_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(RejectionCode::BotHp).unwrap(),
            json!("bot_hp")
        );
        assert_eq!(
            serde_json::to_value(RejectionCode::RateLimited).unwrap(),
            json!("rate_limited")
        );
        assert_eq!(RejectionCode::ServerError.to_string(), "server_error");
    }
}
