//! Raw text to [`TypedValue`] conversion

use super::node::TypedValue;
use crate::error::{BrewFoldError, BrewFoldResult};
use crate::schema::ValueType;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Raw text after boolean token normalization.
///
/// Only the exact tokens `TRUE` and `FALSE` become booleans; `true`, `False`
/// and friends stay text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized<'a> {
    Token(bool),
    Text(&'a str),
}

pub fn normalize_token(raw: &str) -> Normalized<'_> {
    match raw {
        "TRUE" => Normalized::Token(true),
        "FALSE" => Normalized::Token(false),
        other => Normalized::Text(other),
    }
}

/// Coerces one raw value to the declared type of `field`
pub fn coerce(field: &str, value_type: &ValueType, raw: &str) -> BrewFoldResult<TypedValue> {
    let text = match (normalize_token(raw), value_type) {
        (Normalized::Token(_), ValueType::Text) => return Ok(TypedValue::Text(raw.to_string())),
        (Normalized::Token(flag), ValueType::Boolean) => return Ok(TypedValue::Boolean(flag)),
        (Normalized::Token(_), other) => {
            return Err(BrewFoldError::validation(
                field,
                raw,
                format!("boolean token where {} was expected", other),
            ))
        }
        (Normalized::Text(text), _) => text,
    };

    let trimmed = text.trim();
    match value_type {
        ValueType::Text => Ok(TypedValue::Text(text.to_string())),
        _ if trimmed.is_empty() => Ok(TypedValue::Null),
        ValueType::Boolean => Err(BrewFoldError::validation(
            field,
            raw,
            "booleans must be written as TRUE or FALSE",
        )),
        ValueType::Integer => parse_integer(trimmed)
            .map(TypedValue::Integer)
            .ok_or_else(|| BrewFoldError::validation(field, raw, "not an integer")),
        ValueType::Decimal => parse_decimal(trimmed)
            .map(TypedValue::Decimal)
            .ok_or_else(|| BrewFoldError::validation(field, raw, "not a decimal number")),
        ValueType::Enumerated(choices) => {
            if choices
                .iter()
                .any(|choice| choice.eq_ignore_ascii_case(trimmed))
            {
                Ok(TypedValue::Text(trimmed.to_string()))
            } else {
                Err(BrewFoldError::validation(
                    field,
                    raw,
                    format!("expected one of [{}]", choices.join(", ")),
                ))
            }
        }
    }
}

/// Plain or scientific notation
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

/// Integers, also accepting integral decimals such as `3.0`
pub fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    parse_decimal(text)
        .filter(|value| value.fract().is_zero())
        .and_then(|value| value.to_i64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> TypedValue {
        TypedValue::Decimal(Decimal::from_str(text).unwrap())
    }

    #[test]
    fn test_boolean_tokens_are_exact() {
        assert_eq!(normalize_token("TRUE"), Normalized::Token(true));
        assert_eq!(normalize_token("FALSE"), Normalized::Token(false));
        assert_eq!(normalize_token("true"), Normalized::Text("true"));
        assert_eq!(normalize_token("False"), Normalized::Text("False"));

        assert_eq!(
            coerce("add_after_boil", &ValueType::Boolean, "TRUE").unwrap(),
            TypedValue::Boolean(true)
        );
        for raw in ["true", "False", "1", "yes"] {
            let err = coerce("add_after_boil", &ValueType::Boolean, raw).unwrap_err();
            assert!(
                matches!(&err, BrewFoldError::Validation { field, value, .. }
                    if field == "add_after_boil" && value == raw),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_token_on_text_field_keeps_literal() {
        assert_eq!(
            coerce("notes", &ValueType::Text, "TRUE").unwrap(),
            TypedValue::Text("TRUE".to_string())
        );
        assert!(coerce("amount", &ValueType::Decimal, "FALSE").is_err());
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(
            coerce("notes", &ValueType::Text, "").unwrap(),
            TypedValue::Text(String::new())
        );
        assert_eq!(coerce("alpha", &ValueType::Decimal, "").unwrap(), TypedValue::Null);
        assert_eq!(coerce("version", &ValueType::Integer, " ").unwrap(), TypedValue::Null);
        assert_eq!(coerce("flag", &ValueType::Boolean, "").unwrap(), TypedValue::Null);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce("alpha", &ValueType::Decimal, "5.5").unwrap(), dec("5.5"));
        assert_eq!(coerce("amount", &ValueType::Decimal, "0.057").unwrap(), dec("0.057"));
        assert_eq!(coerce("amount", &ValueType::Decimal, "5.7e-2").unwrap(), dec("0.057"));
        assert!(coerce("alpha", &ValueType::Decimal, "five").is_err());

        assert_eq!(coerce("version", &ValueType::Integer, "1").unwrap(), TypedValue::Integer(1));
        assert_eq!(coerce("version", &ValueType::Integer, "3.0").unwrap(), TypedValue::Integer(3));
        assert!(coerce("version", &ValueType::Integer, "3.5").is_err());
    }

    #[test]
    fn test_enumerated_keeps_original_spelling() {
        let use_type = ValueType::Enumerated(vec!["boil".to_string(), "dry hop".to_string()]);
        assert_eq!(
            coerce("use", &use_type, "Dry Hop").unwrap(),
            TypedValue::Text("Dry Hop".to_string())
        );
        let err = coerce("use", &use_type, "Whirlpool").unwrap_err();
        assert!(err.to_string().contains("Whirlpool"));
    }
}
