//! Loosely-typed monetary amounts.
//!
//! Browser clients send prices and totals as whatever the catalog happened to
//! hold: numbers, numeric strings, sometimes garbage. Everything funnels
//! through [`coerce_amount`], which never fails: anything that is not a
//! number becomes zero.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value};

/// Maximum fraction digits shown by [`format_ru`].
const DISPLAY_FRACTION_DIGITS: u32 = 3;

/// Group separator used by the Russian locale (no-break space).
const RU_GROUP_SEPARATOR: char = '\u{a0}';

/// Coerce a JSON value into a decimal amount.
///
/// Numbers and numeric strings (surrounding whitespace allowed, scientific
/// notation accepted) parse; booleans map to 1/0; everything else is 0.
#[must_use]
pub fn coerce_amount(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()).unwrap_or(Decimal::ZERO),
        Value::String(s) => parse_decimal(s.trim()).unwrap_or(Decimal::ZERO),
        Value::Bool(true) => Decimal::ONE,
        _ => Decimal::ZERO,
    }
}

/// Coerce a JSON value into a non-negative whole quantity.
///
/// Fractions are floored and negatives clamp to zero.
#[must_use]
pub fn coerce_quantity(value: &Value) -> u32 {
    let amount = coerce_amount(value).floor();
    if amount.is_sign_negative() {
        return 0;
    }
    amount.to_u32().unwrap_or(u32::MAX)
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

/// An amount as a plain JSON number, the form browser code expects.
///
/// Values too precise for a float keep the nearest `f64`; the rest are
/// emitted exactly.
#[must_use]
pub fn amount_to_json(amount: Decimal) -> Value {
    Number::from_str(&amount.normalize().to_string())
        .ok()
        .or_else(|| amount.to_f64().and_then(Number::from_f64))
        .map_or(Value::Null, Value::Number)
}

/// Serde adapter: serialize an amount as a JSON number.
///
/// # Errors
///
/// Propagates serializer failures.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub fn serialize_amount<S>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    amount_to_json(*amount).serialize(serializer)
}

/// Serde adapter: deserialize any JSON value as a coerced amount.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce a JSON value.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

/// Serde adapter: deserialize any JSON value as a coerced quantity.
///
/// # Errors
///
/// Only fails if the underlying deserializer cannot produce a JSON value.
pub fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_quantity(&value))
}

/// Format an amount the way the Russian locale prints numbers.
///
/// Integer digits are grouped by three with a no-break space, the decimal
/// separator is a comma, and at most three fraction digits are kept with
/// trailing zeros dropped: `1234567.5` → `1 234 567,5`.
#[must_use]
pub fn format_ru(amount: Decimal) -> String {
    let rounded = amount
        .round_dp_with_strategy(DISPLAY_FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .normalize();
    let plain = rounded.abs().to_string();
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

    let mut out = String::with_capacity(plain.len() + int_part.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    let digits = int_part.len();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            out.push(RU_GROUP_SEPARATOR);
        }
        out.push(c);
    }
    if !frac_part.is_empty() {
        out.push(',');
        out.push_str(frac_part);
    }
    out
}
