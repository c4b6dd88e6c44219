//! Lenient decoding of client-supplied money and date values.
//!
//! Amounts arrive either as JSON numbers or as numeric strings; dates as
//! `YYYY-MM-DD` or a full RFC 3339 timestamp. Everything is normalized to
//! [`Decimal`] / [`NaiveDate`] before it reaches a service.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use validator::ValidationError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoerceError {
    #[error("amount must be a number or numeric string, got {0}")]
    InvalidAmount(String),
    #[error("date must be YYYY-MM-DD or RFC 3339, got {0:?}")]
    InvalidDate(String),
}

/// Largest amount the money columns hold exactly on every backend: 15
/// significant digits survive a SQLite REAL and fit `DECIMAL(16, 2)`.
pub const MAX_AMOUNT: Decimal = dec!(9999999999999.99);

/// Decimal places kept by the money columns.
pub const AMOUNT_SCALE: u32 = 2;

/// Parses an amount from a JSON number or numeric string.
pub fn parse_amount(value: &Value) -> Result<Decimal, CoerceError> {
    match value {
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|_| CoerceError::InvalidAmount(text))
        }
        Value::String(text) => {
            let trimmed = text.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map_err(|_| CoerceError::InvalidAmount(format!("{:?}", text)))
        }
        other => Err(CoerceError::InvalidAmount(other.to_string())),
    }
}

/// Parses `YYYY-MM-DD`, falling back to the date part of an RFC 3339 timestamp.
pub fn parse_date(text: &str) -> Result<NaiveDate, CoerceError> {
    let trimmed = text.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| CoerceError::InvalidDate(text.to_string()))
}

/// The one null-to-default policy for optional text at the view boundary.
pub fn text_or_default(value: Option<String>) -> String {
    value.unwrap_or_default()
}

/// Blank optional text is stored as NULL.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn amount_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Rejects amounts the money columns would round: more than
/// [`AMOUNT_SCALE`] decimal places or a magnitude above [`MAX_AMOUNT`].
pub fn validate_storable(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(amount_error(
            "scale",
            format!("amount must have at most {} decimal places", AMOUNT_SCALE),
        ));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(amount_error(
            "range",
            format!("amount must not exceed {}", MAX_AMOUNT),
        ));
    }
    Ok(())
}

/// `validator` hook for ledger amounts.
pub fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(amount_error(
            "non_negative",
            "amount must not be negative".to_string(),
        ));
    }
    validate_storable(amount)
}

/// `validator` hook for amounts that move the running funds total.
pub fn validate_positive(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(amount_error(
            "positive",
            "amount must be greater than zero".to_string(),
        ));
    }
    validate_storable(amount)
}

/// `validator` hook for required text; the empty string is left to `length`.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Keeps an explicit `null` apart from an absent field: absent is `None`
/// (with `#[serde(default)]`), `null` is `Some(None)`.
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_amount(&value).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_amount(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_date(&text).map_err(serde::de::Error::custom)
}

pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) => parse_date(&text)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[rstest]
    #[case(json!(1500), dec!(1500))]
    #[case(json!(12.75), dec!(12.75))]
    #[case(json!("2500"), dec!(2500))]
    #[case(json!(" 99.50 "), dec!(99.50))]
    #[case(json!("1e3"), dec!(1000))]
    fn amounts_accept_numbers_and_numeric_strings(#[case] input: Value, #[case] expected: Decimal) {
        assert_eq!(parse_amount(&input).unwrap(), expected);
    }

    #[rstest]
    #[case(json!("abc"))]
    #[case(json!(""))]
    #[case(json!(null))]
    #[case(json!(true))]
    #[case(json!([1]))]
    fn non_numeric_amounts_are_rejected(#[case] input: Value) {
        assert!(matches!(
            parse_amount(&input),
            Err(CoerceError::InvalidAmount(_))
        ));
    }

    #[rstest]
    #[case("2024-03-15")]
    #[case("2024-03-15T10:30:00Z")]
    #[case("2024-03-15T23:59:59+05:30")]
    fn dates_accept_plain_and_rfc3339(#[case] input: &str) {
        assert_eq!(
            parse_date(input).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(parse_date("15/03/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn null_text_maps_to_empty_string() {
        assert_eq!(text_or_default(None), "");
        assert_eq!(text_or_default(Some("cash".into())), "cash");
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(Some(" NEFT ".into())), Some("NEFT".to_string()));
    }

    #[test]
    fn amount_validators() {
        assert!(validate_non_negative(&dec!(0)).is_ok());
        assert!(validate_non_negative(&dec!(-0.01)).is_err());
        assert!(validate_positive(&dec!(0)).is_err());
        assert!(validate_positive(&dec!(0.01)).is_ok());
    }

    #[rstest]
    #[case(dec!(0.01))]
    #[case(dec!(1.500))]
    #[case(dec!(9999999999999.99))]
    fn storable_amounts_pass(#[case] amount: Decimal) {
        assert!(validate_non_negative(&amount).is_ok());
        assert!(validate_positive(&amount).is_ok());
    }

    #[rstest]
    #[case(dec!(0.001), "scale")]
    #[case(dec!(12.345), "scale")]
    #[case(dec!(10000000000000), "range")]
    #[case(dec!(99999999999999.99), "range")]
    #[case(Decimal::MAX, "range")]
    fn amounts_that_would_be_rounded_fail(#[case] amount: Decimal, #[case] code: &str) {
        assert_eq!(validate_storable(&amount).unwrap_err().code, code);
        assert_eq!(validate_positive(&amount).unwrap_err().code, code);
        assert_eq!(validate_non_negative(&amount).unwrap_err().code, code);
    }

    #[test]
    fn whitespace_only_text_is_blank() {
        assert!(validate_not_blank("Tower A").is_ok());
        assert!(validate_not_blank("").is_ok());
        assert_eq!(validate_not_blank("   ").unwrap_err().code, "blank");
    }

    #[derive(Debug, Deserialize)]
    struct Assignment {
        #[serde(default, deserialize_with = "deserialize_nullable")]
        supervisor_id: Option<Option<u32>>,
    }

    #[test]
    fn nullable_keeps_null_apart_from_absent() {
        let absent: Assignment = serde_json::from_value(json!({})).unwrap();
        assert_eq!(absent.supervisor_id, None);
        let cleared: Assignment = serde_json::from_value(json!({ "supervisor_id": null })).unwrap();
        assert_eq!(cleared.supervisor_id, Some(None));
        let set: Assignment = serde_json::from_value(json!({ "supervisor_id": 7 })).unwrap();
        assert_eq!(set.supervisor_id, Some(Some(7)));
    }

    #[derive(Debug, Deserialize)]
    struct Payload {
        #[serde(deserialize_with = "deserialize_amount")]
        amount: Decimal,
        #[serde(default, deserialize_with = "deserialize_optional_amount")]
        extra: Option<Decimal>,
        #[serde(deserialize_with = "deserialize_date")]
        date: NaiveDate,
        #[serde(default, deserialize_with = "deserialize_optional_date")]
        start: Option<NaiveDate>,
    }

    #[test]
    fn serde_helpers_decode_payload() {
        let payload: Payload =
            serde_json::from_value(json!({ "amount": "300", "date": "2024-01-02", "start": "" }))
                .unwrap();
        assert_eq!(payload.amount, dec!(300));
        assert_eq!(payload.extra, None);
        assert_eq!(payload.start, None);

        let err = serde_json::from_value::<Payload>(json!({ "amount": "x", "date": "2024-01-02" }))
            .unwrap_err();
        assert!(err.to_string().contains("amount must be a number"));
    }
}
