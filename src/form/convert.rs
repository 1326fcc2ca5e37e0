use serde_json::Number;

use crate::domain::{FieldKind, FieldValue};

use super::error::FormError;

/// Interprets raw control text according to the field's declared kind.
pub(crate) fn coerce_text(field: &str, kind: FieldKind, raw: &str) -> Result<FieldValue, FormError> {
    let invalid = |reason: &str| FormError::InvalidInput {
        field: field.to_string(),
        input: raw.to_string(),
        reason: reason.to_string(),
    };
    match kind {
        FieldKind::Null | FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
        FieldKind::Number => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(FieldValue::Null);
            }
            if let Ok(int) = trimmed.parse::<i64>() {
                return Ok(FieldValue::Number(int.into()));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(FieldValue::Number)
                .ok_or_else(|| invalid("expected a number"))
        }
        FieldKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(FieldValue::Bool(true)),
            "false" | "0" | "off" | "no" | "" => Ok(FieldValue::Bool(false)),
            _ => Err(invalid("expected a boolean")),
        },
        FieldKind::Range => Err(invalid("date ranges take structured input")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_fields_parse_integers_and_floats() {
        assert_eq!(
            coerce_text("hourly", FieldKind::Number, " 42 ").unwrap(),
            FieldValue::from(42)
        );
        assert_eq!(
            coerce_text("hourly", FieldKind::Number, "12.5").unwrap(),
            FieldValue::from(12.5)
        );
        assert_eq!(
            coerce_text("hourly", FieldKind::Number, "").unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn non_numeric_text_is_rejected_for_number_fields() {
        let err = coerce_text("hourly", FieldKind::Number, "lots").unwrap_err();
        assert!(matches!(err, FormError::InvalidInput { ref field, .. } if field == "hourly"));
        assert!(coerce_text("hourly", FieldKind::Number, "NaN").is_err());
    }

    #[test]
    fn text_and_nullable_fields_keep_raw_input() {
        assert_eq!(
            coerce_text("note", FieldKind::Text, "  spaced ").unwrap(),
            FieldValue::from("  spaced ")
        );
        assert_eq!(
            coerce_text("note", FieldKind::Null, "x").unwrap(),
            FieldValue::from("x")
        );
    }

    #[test]
    fn boolean_words_are_understood() {
        assert_eq!(
            coerce_text("vip", FieldKind::Bool, "on").unwrap(),
            FieldValue::Bool(true)
        );
        assert!(coerce_text("vip", FieldKind::Bool, "maybe").is_err());
    }
}
