use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;

/// A single column or argument value.
///
/// Raw rows coming out of the driver only ever contain `Null`, `Int`, `Float`
/// and `Bytes`; the other variants are produced by coercion or supplied by
/// callers as arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Signed 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// Boolean, sent over the wire as 1/0
    Bool(bool),
    /// UTF-8 text
    Text(String),
    /// Raw byte sequence, as scanned from textual and temporal columns
    Bytes(Vec<u8>),
    /// Naive (zone-less) timestamp
    DateTime(NaiveDateTime),
}

impl Value {
    /// Short name of the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Bool(_) => "BOOL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BYTES",
            Value::DateTime(_) => "DATETIME",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a boolean to the integer the wire protocol carries.
    #[must_use]
    pub fn into_wire(self) -> Value {
        match self {
            Value::Bool(b) => Value::Int(i64::from(b)),
            other => other,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Keyed mapping from column or argument name to value.
pub type Mapping = HashMap<String, Value>;

/// Declared type of a destination field; selects its coercion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    DateTime,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Bool => "BOOL",
            FieldKind::Int => "INT",
            FieldKind::Float => "FLOAT",
            FieldKind::Text => "TEXT",
            FieldKind::Bytes => "BYTES",
            FieldKind::DateTime => "DATETIME",
        };
        f.write_str(name)
    }
}

/// A Rust type that can sit in a record field or scalar destination.
///
/// Conversions are exact: an `i64` field only accepts `Value::Int`, there is
/// no widening or narrowing between numeric types. `from_value` hands the
/// rejected value back so the caller can report what it found.
pub trait FieldType: Sized + Send + Sync {
    const KIND: FieldKind;

    fn from_value(value: Value) -> std::result::Result<Self, Value>;

    fn to_value(&self) -> Value;
}

macro_rules! impl_field_type {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl FieldType for $ty {
            const KIND: FieldKind = FieldKind::$kind;

            fn from_value(value: Value) -> std::result::Result<Self, Value> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }
    };
}

impl_field_type!(bool, Bool, Bool);
impl_field_type!(i64, Int, Int);
impl_field_type!(f64, Float, Float);
impl_field_type!(String, Text, Text);
impl_field_type!(Vec<u8>, Bytes, Bytes);
impl_field_type!(NaiveDateTime, DateTime, DateTime);

impl<T: FieldType> FieldType for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldType::to_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_exact_identity() {
        assert_eq!(i64::from_value(Value::Int(7)), Ok(7));
        assert_eq!(i64::from_value(Value::Float(7.0)), Err(Value::Float(7.0)));
        assert_eq!(
            String::from_value(Value::Bytes(b"x".to_vec())),
            Err(Value::Bytes(b"x".to_vec()))
        );
    }

    #[test]
    fn test_option_accepts_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<i64>::from_value(Value::Int(3)), Ok(Some(3)));
        assert_eq!(i64::from_value(Value::Null), Err(Value::Null));
        assert_eq!(Option::<String>::KIND, FieldKind::Text);
    }

    #[test]
    fn test_into_wire_converts_booleans() {
        assert_eq!(Value::Bool(true).into_wire(), Value::Int(1));
        assert_eq!(Value::Bool(false).into_wire(), Value::Int(0));
        assert_eq!(Value::Text("a".into()).into_wire(), Value::Text("a".into()));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }
}
