//! Order documents and the raw submission they are built from.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Email, OrderId, OrderStatus, coerce_amount, coerce_quantity};

/// Customer contact details attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    /// `None` when the customer left the field empty.
    pub email: Option<Email>,
}

/// A single order line as the client sent it.
///
/// The entry is kept verbatim (catalog items carry arbitrary extra fields
/// such as `image`, `size` or `color`, and nothing stops a client from
/// sending a bare value); the accessors read the well-known keys with the
/// same lenient coercion the cart uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderItem(Value);

impl OrderItem {
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Display name of the item, if it has a textual or numeric one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        match self.0.get("name")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Quantity ordered (non-numeric counts as zero).
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.0.get("quantity").map_or(0, coerce_quantity)
    }

    /// Unit price (non-numeric counts as zero).
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.0.get("price").map_or(Decimal::ZERO, coerce_amount)
    }

    /// Raw field access for anything beyond the well-known keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The fields of the line, unless the client sent a bare value.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }
}

/// A persisted order document.
///
/// Created once by the intake pipeline and never mutated by it; status
/// transitions belong to back-office tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub contact: Contact,
    pub items: Vec<OrderItem>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    /// Requester address the order was submitted from.
    pub ip: String,
}

impl Order {
    /// Create a fresh `new` order with a server-assigned ID and timestamp.
    #[must_use]
    pub fn new(
        contact: Contact,
        items: Vec<OrderItem>,
        total: Decimal,
        ip: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            contact,
            items,
            total,
            status: OrderStatus::New,
            created_at,
            ip,
        }
    }
}

/// An order submission exactly as received, before any validation.
///
/// Every field is optional and loosely typed: the validator decides what is
/// acceptable, and a wrongly-typed field must surface as that field's
/// rejection code rather than as a parse failure.
#[derive(Debug, Clone, Default)]
pub struct OrderSubmission {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Value,
    pub items: Value,
    pub total: Value,
    pub recaptcha_token: Option<String>,
    /// Hidden form field; humans never fill it in.
    pub honeypot: Value,
}

impl OrderSubmission {
    /// Extract a submission from a request body.
    ///
    /// Non-object bodies yield an empty submission.
    #[must_use]
    pub fn from_json(body: &Value) -> Self {
        let field = |key: &str| body.get(key).cloned().unwrap_or(Value::Null);
        let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);

        Self {
            name: text("name"),
            phone: text("phone"),
            email: field("email"),
            items: field("items"),
            total: field("total"),
            recaptcha_token: token(body.get("recaptchaToken")),
            honeypot: field("hp"),
        }
    }
}

/// A truthy token is sent for verification as-is; non-strings are passed in
/// their JSON text form and are expected to fail screening.
fn token(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        other if is_truthy(other) => Some(other.to_string()),
        _ => None,
    }
}

/// Truthiness as browser code understands it.
///
/// `null`, `false`, `0`, and `""` are falsy; every other value (including
/// empty arrays and objects) is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_item_accessors_are_lenient() {
        let item = OrderItem::from_value(json!({
            "name": "Дверь Классика",
            "quantity": "2",
            "price": "bad",
            "color": "white"
        }));

        assert_eq!(item.name().as_deref(), Some("Дверь Классика"));
        assert_eq!(item.quantity(), 2);
        assert_eq!(item.price(), Decimal::ZERO);
        assert_eq!(item.get("color"), Some(&json!("white")));
    }

    #[test]
    fn test_bare_item_is_kept() {
        let item = OrderItem::from_value(json!("door"));
        assert!(item.as_object().is_none());
        assert!(item.name().is_none());
        assert_eq!(item.quantity(), 0);
        assert_eq!(serde_json::to_value(&item).unwrap(), json!("door"));
    }

    #[test]
    fn test_item_serializes_verbatim() {
        let raw = json!({"id": "d1", "name": "Door", "quantity": 1, "price": 100});
        let item = OrderItem::from_value(raw.clone());
        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_submission_from_json() {
        let body = json!({
            "name": "Иван Петров",
            "phone": "+79991234567",
            "items": [{"name": "Door"}],
            "total": 100,
            "recaptchaToken": "",
            "hp": ""
        });
        let submission = OrderSubmission::from_json(&body);

        assert_eq!(submission.name.as_deref(), Some("Иван Петров"));
        assert_eq!(submission.phone.as_deref(), Some("+79991234567"));
        assert_eq!(submission.email, Value::Null);
        assert!(submission.recaptcha_token.is_none());
        assert!(!is_truthy(&submission.honeypot));
    }

    #[test]
    fn test_truthy_non_string_token_is_present() {
        let token = |value: Value| OrderSubmission::from_json(&json!({"recaptchaToken": value})).recaptcha_token;

        assert_eq!(token(json!(12345)).as_deref(), Some("12345"));
        assert_eq!(token(json!(true)).as_deref(), Some("true"));
        assert_eq!(token(json!("abc")).as_deref(), Some("abc"));
        assert!(token(json!(0)).is_none());
        assert!(token(json!(false)).is_none());
        assert!(token(json!(null)).is_none());
    }

    #[test]
    fn test_submission_from_non_object() {
        let submission = OrderSubmission::from_json(&json!([1, 2, 3]));
        assert!(submission.name.is_none());
        assert_eq!(submission.items, Value::Null);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("1")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_new_order_is_new() {
        let order = Order::new(
            Contact {
                name: "Иван Петров".to_string(),
                phone: "+79991234567".to_string(),
                email: None,
            },
            vec![],
            Decimal::ZERO,
            "127.0.0.1".to_string(),
            Utc::now(),
        );
        assert_eq!(order.status, OrderStatus::New);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], json!("new"));
        assert!(json.get("createdAt").is_some());
    }
}
