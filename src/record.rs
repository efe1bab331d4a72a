use crate::value::{FieldKind, Value};

/// Static description of one record field.
///
/// `format` is only consulted for [`FieldKind::DateTime`] fields and holds a
/// chrono `strftime` pattern such as `"%Y-%m-%d %H:%M:%S"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub format: Option<&'static str>,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind, format: Option<&'static str>) -> Self {
        Self { name, kind, format }
    }
}

/// A struct whose fields can be read and written by name.
///
/// Records serve both as argument sources for named tokens and as
/// destinations for materialized rows. Implement it with [`record!`](crate::record!)
/// rather than by hand.
pub trait Record: Send + Sync {
    /// Field table for the type, declared once.
    fn schema() -> &'static [FieldSpec]
    where
        Self: Sized;

    /// Same table, reachable through a trait object.
    fn fields(&self) -> &'static [FieldSpec];

    /// Reads a field by name.
    fn get(&self, name: &str) -> Option<Value>;

    /// Writes an already-coerced value into a field by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldBinding`](crate::Error::FieldBinding) if there is
    /// no such field or the value's type does not match it exactly.
    fn set(&mut self, name: &str, value: Value) -> crate::Result<()>;
}

/// Implements [`Record`] for a struct.
///
/// Each listed field becomes a column/argument name. Temporal fields carry
/// their parse format after `=`.
///
/// ```
/// use chrono::NaiveDateTime;
/// use sqlx_named_map::record;
///
/// #[derive(Debug, Default)]
/// struct User {
///     id: i64,
///     name: String,
///     active: bool,
///     created: Option<NaiveDateTime>,
/// }
///
/// record!(User {
///     id: i64,
///     name: String,
///     active: bool,
///     created: Option<NaiveDateTime> = "%Y-%m-%d %H:%M:%S",
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ident { $($field:ident : $fty:ty $(= $format:literal)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn schema() -> &'static [$crate::FieldSpec] {
                const FIELDS: &[$crate::FieldSpec] = &[
                    $($crate::FieldSpec::new(
                        stringify!($field),
                        <$fty as $crate::FieldType>::KIND,
                        $crate::record!(@format $($format)?),
                    )),*
                ];
                FIELDS
            }

            fn fields(&self) -> &'static [$crate::FieldSpec] {
                <Self as $crate::Record>::schema()
            }

            fn get(&self, name: &str) -> Option<$crate::Value> {
                match name {
                    $(stringify!($field) => Some($crate::FieldType::to_value(&self.$field)),)*
                    _ => None,
                }
            }

            fn set(&mut self, name: &str, value: $crate::Value) -> $crate::Result<()> {
                match name {
                    $(stringify!($field) => {
                        self.$field = <$fty as $crate::FieldType>::from_value(value).map_err(|found| {
                            $crate::Error::FieldBinding {
                                field: name.to_owned(),
                                reason: format!(
                                    "expected {}, found {}",
                                    <$fty as $crate::FieldType>::KIND,
                                    found.type_name()
                                ),
                            }
                        })?;
                        Ok(())
                    })*
                    _ => Err($crate::Error::FieldBinding {
                        field: name.to_owned(),
                        reason: "no such field".to_owned(),
                    }),
                }
            }
        }
    };
    (@format) => { None };
    (@format $format:literal) => { Some($format) };
}
