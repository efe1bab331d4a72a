use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::record::FieldSpec;
use crate::value::{FieldKind, Value};

/// How a raw column value is turned into the value a field expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Hand the raw value over unchanged.
    Direct,
    /// Nonzero integer is `true`, zero is `false`.
    BooleanFromInteger,
    /// Parse a byte sequence with the field's declared format.
    TemporalFromText { format: Option<&'static str> },
    /// Decode a byte sequence as UTF-8 text; anything else passes through.
    TextFromBytes,
}

impl Coercion {
    /// Picks the rule for a field from its declared kind.
    #[must_use]
    pub fn for_kind(kind: FieldKind, format: Option<&'static str>) -> Self {
        match kind {
            FieldKind::Bool => Coercion::BooleanFromInteger,
            FieldKind::DateTime => Coercion::TemporalFromText { format },
            FieldKind::Text => Coercion::TextFromBytes,
            FieldKind::Int | FieldKind::Float | FieldKind::Bytes => Coercion::Direct,
        }
    }

    #[must_use]
    pub fn for_field(spec: &FieldSpec) -> Self {
        Self::for_kind(spec.kind, spec.format)
    }

    /// Applies the rule to one raw value. NULL always passes through so that
    /// `Option` fields can accept it.
    ///
    /// # Errors
    ///
    /// - [`Error::FieldBinding`] when the raw value has the wrong type for the rule
    /// - [`Error::TemporalFormat`] when the format is missing or does not parse
    pub fn apply(self, field: &str, raw: Value) -> Result<Value> {
        match self {
            Coercion::Direct => Ok(raw),
            Coercion::BooleanFromInteger => match raw {
                Value::Int(i) => Ok(Value::Bool(i != 0)),
                Value::Null => Ok(Value::Null),
                other => Err(Error::field_mismatch(field, FieldKind::Int, &other)),
            },
            Coercion::TemporalFromText { format } => {
                let format = match format {
                    Some(format) if !format.is_empty() => format,
                    _ => {
                        return Err(Error::TemporalFormat {
                            field: field.to_owned(),
                            reason: "no date format specified".to_owned(),
                        })
                    }
                };
                match raw {
                    Value::Bytes(bytes) => {
                        let text = decode_text(field, bytes)?;
                        parse_temporal(field, &text, format).map(Value::DateTime)
                    }
                    Value::Text(text) => parse_temporal(field, &text, format).map(Value::DateTime),
                    Value::Null => Ok(Value::Null),
                    other => Err(Error::field_mismatch(field, FieldKind::Bytes, &other)),
                }
            }
            Coercion::TextFromBytes => match raw {
                Value::Bytes(bytes) => decode_text(field, bytes).map(Value::Text),
                other => Ok(other),
            },
        }
    }
}

fn decode_text(field: &str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::FieldBinding {
        field: field.to_owned(),
        reason: format!("invalid UTF-8 text: {e}"),
    })
}

/// Parses `text` as a timestamp; date-only formats yield midnight.
fn parse_temporal(field: &str, text: &str, format: &str) -> Result<NaiveDateTime> {
    match NaiveDateTime::parse_from_str(text, format) {
        Ok(datetime) => Ok(datetime),
        Err(datetime_err) => NaiveDate::parse_from_str(text, format)
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|_| Error::TemporalFormat {
                field: field.to_owned(),
                reason: format!("'{text}' does not match '{format}': {datetime_err}"),
            }),
    }
}
