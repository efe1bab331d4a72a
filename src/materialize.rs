use std::collections::VecDeque;

use tracing::trace;

use crate::coerce::Coercion;
use crate::error::{Error, Result};
use crate::record::{FieldSpec, Record};
use crate::value::{FieldKind, FieldType, Mapping, Value};

/// A cursor over raw rows: column names plus one value per column per row.
pub trait RowSource {
    fn columns(&self) -> &[String];

    /// Next row in fetch order, or `None` once exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<Value>>>;
}

/// An in-memory [`RowSource`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

impl RowSet {
    #[must_use]
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: VecDeque::new(),
        }
    }

    /// Appends a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] if the row width differs from the column count.
    pub fn push(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Scan {
                column: self.columns.join(","),
                reason: format!("row has {} values for {} columns", row.len(), self.columns.len()),
            });
        }
        self.rows.push_back(row);
        Ok(())
    }

    /// Builder-style [`push`](Self::push).
    ///
    /// # Errors
    ///
    /// Same as [`push`](Self::push).
    pub fn with_row(mut self, row: Vec<Value>) -> Result<Self> {
        self.push(row)?;
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for RowSet {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

/// A single primitive destination.
pub trait Scalar: Send {
    fn kind(&self) -> FieldKind;

    /// Stores a coerced value, handing it back if the type does not match.
    fn assign(&mut self, value: Value) -> std::result::Result<(), Value>;
}

impl<T: FieldType> Scalar for T {
    fn kind(&self) -> FieldKind {
        T::KIND
    }

    fn assign(&mut self, value: Value) -> std::result::Result<(), Value> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

/// A growable sequence of records.
pub trait RecordList: Send {
    fn element_schema(&self) -> &'static [FieldSpec];

    /// Replaces the contents with one record per remaining row.
    fn fill(&mut self, plan: &FieldPlan, rows: &mut dyn RowSource) -> Result<usize>;
}

impl<R: Record + Default> RecordList for Vec<R> {
    fn element_schema(&self) -> &'static [FieldSpec] {
        R::schema()
    }

    fn fill(&mut self, plan: &FieldPlan, rows: &mut dyn RowSource) -> Result<usize> {
        let mut built = Vec::new();
        while let Some(row) = rows.next_row()? {
            let mut element = R::default();
            plan.populate(&mut element, row)?;
            built.push(element);
        }
        *self = built;
        Ok(self.len())
    }
}

/// Where materialized results are written.
///
/// The variant is chosen once by the caller; the materializer never inspects
/// values to guess a shape.
pub enum Destination<'a> {
    Scalar(&'a mut dyn Scalar),
    Record(&'a mut dyn Record),
    Mapping(&'a mut Mapping),
    Records(&'a mut dyn RecordList),
    Mappings(&'a mut Vec<Mapping>),
}

impl<'a> Destination<'a> {
    /// Whether the destination reads at most the first row.
    #[must_use]
    pub fn takes_single_row(&self) -> bool {
        !matches!(self, Destination::Records(_) | Destination::Mappings(_))
    }

    pub fn scalar<T: FieldType>(slot: &'a mut T) -> Self {
        Destination::Scalar(slot)
    }

    pub fn record<R: Record>(record: &'a mut R) -> Self {
        Destination::Record(record)
    }

    pub fn mapping(mapping: &'a mut Mapping) -> Self {
        Destination::Mapping(mapping)
    }

    pub fn records<R: Record + Default>(records: &'a mut Vec<R>) -> Self {
        Destination::Records(records)
    }

    pub fn mappings(mappings: &'a mut Vec<Mapping>) -> Self {
        Destination::Mappings(mappings)
    }
}

/// Per-call coercion table: for each column, the record field it feeds and
/// the rule that converts it. Built once from the column names, then reused
/// for every row.
#[derive(Debug, Clone)]
pub struct FieldPlan {
    bindings: Vec<(&'static str, Coercion)>,
}

impl FieldPlan {
    /// Matches every column to a field of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldBinding`] for a column with no matching field,
    /// or for a column name that appears twice.
    pub fn new(schema: &'static [FieldSpec], columns: &[String]) -> Result<Self> {
        let bindings = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                if columns[..index].contains(column) {
                    return Err(Error::FieldBinding {
                        field: column.clone(),
                        reason: "column appears more than once in the result".to_owned(),
                    });
                }
                schema
                    .iter()
                    .find(|spec| spec.name == column.as_str())
                    .map(|spec| (spec.name, Coercion::for_field(spec)))
                    .ok_or_else(|| Error::FieldBinding {
                        field: column.clone(),
                        reason: "no field matches this column".to_owned(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bindings })
    }

    /// Writes one raw row into `target`.
    ///
    /// # Errors
    ///
    /// Returns the first coercion or binding error.
    pub fn populate(&self, target: &mut dyn Record, row: Vec<Value>) -> Result<()> {
        for (&(field, coercion), raw) in self.bindings.iter().zip(row) {
            let value = coercion.apply(field, raw)?;
            target.set(field, value)?;
        }
        Ok(())
    }
}

/// Wraps a cursor and rejects any row whose width differs from the column
/// count.
struct CheckedRows<'r> {
    inner: &'r mut dyn RowSource,
    width: usize,
}

impl RowSource for CheckedRows<'_> {
    fn columns(&self) -> &[String] {
        self.inner.columns()
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        match self.inner.next_row()? {
            Some(row) if row.len() != self.width => Err(Error::Scan {
                column: self.inner.columns().join(","),
                reason: format!("row has {} values for {} columns", row.len(), self.width),
            }),
            row => Ok(row),
        }
    }
}

/// Builds a mapping from one row; byte sequences become text when they are
/// valid UTF-8.
fn build_mapping(columns: &[String], row: Vec<Value>) -> Mapping {
    columns
        .iter()
        .cloned()
        .zip(row.into_iter().map(|raw| match raw {
            Value::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Value::Text(text),
                Err(e) => Value::Bytes(e.into_bytes()),
            },
            other => other,
        }))
        .collect()
}

/// Populates `destination` from `rows`.
///
/// Sequence destinations are replaced by one element per row, in fetch order.
/// Single record, mapping and scalar destinations consume at most the first
/// row and stay untouched when there is none. The first failure aborts the
/// call; sequence and mapping destinations are only written on success.
///
/// # Errors
///
/// - [`Error::DestinationShape`] for a scalar destination whose result set does
///   not have exactly one column
/// - [`Error::FieldBinding`] / [`Error::TemporalFormat`] from field coercion
/// - [`Error::Scan`] for a row whose width differs from the column count
/// - any error raised by the cursor
pub fn materialize(rows: &mut dyn RowSource, destination: Destination<'_>) -> Result<()> {
    let columns = rows.columns().to_vec();
    let mut checked = CheckedRows {
        inner: rows,
        width: columns.len(),
    };
    let rows: &mut dyn RowSource = &mut checked;

    match destination {
        Destination::Records(list) => {
            let plan = FieldPlan::new(list.element_schema(), &columns)?;
            let count = list.fill(&plan, rows)?;
            trace!(rows = count, "materialized record sequence");
        }
        Destination::Mappings(list) => {
            let mut built = Vec::new();
            while let Some(row) = rows.next_row()? {
                built.push(build_mapping(&columns, row));
            }
            trace!(rows = built.len(), "materialized mapping sequence");
            *list = built;
        }
        Destination::Record(record) => {
            let plan = FieldPlan::new(record.fields(), &columns)?;
            if let Some(row) = rows.next_row()? {
                plan.populate(record, row)?;
            }
        }
        Destination::Mapping(mapping) => {
            if let Some(row) = rows.next_row()? {
                mapping.extend(build_mapping(&columns, row));
            }
        }
        Destination::Scalar(slot) => {
            if columns.len() != 1 {
                return Err(Error::DestinationShape(format!(
                    "expected 1 column for a scalar destination, got {}",
                    columns.len()
                )));
            }
            if let Some(row) = rows.next_row()? {
                let column = &columns[0];
                let raw = row.into_iter().next().unwrap_or(Value::Null);
                let expected = slot.kind();
                let value = Coercion::for_kind(expected, None).apply(column, raw)?;
                slot.assign(value)
                    .map_err(|found| Error::field_mismatch(column, expected, &found))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Event {
        id: i64,
        title: String,
        done: bool,
        day: NaiveDateTime,
    }

    crate::record!(Event {
        id: i64,
        title: String,
        done: bool,
        day: NaiveDateTime = "%Y-%m-%d",
    });

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Stamp {
        at: Option<NaiveDateTime>,
    }

    crate::record!(Stamp { at: Option<NaiveDateTime> = "%Y-%m-%d %H:%M:%S" });

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Unformatted {
        at: Option<NaiveDateTime>,
    }

    crate::record!(Unformatted { at: Option<NaiveDateTime> });

    fn bytes(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn event_rows(k: i64) -> RowSet {
        let mut rows = RowSet::new(["id", "title", "done", "day"]);
        for i in 0..k {
            rows.push(vec![
                Value::Int(i),
                bytes(&format!("event {i}")),
                Value::Int(i % 2),
                bytes("2024-01-15"),
            ])
            .unwrap();
        }
        rows
    }

    #[test]
    fn test_records_preserve_row_count_and_order() {
        let mut events: Vec<Event> = Vec::new();
        materialize(&mut event_rows(3), Destination::records(&mut events)).unwrap();

        assert_eq!(events.len(), 3);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.id, i as i64);
            assert_eq!(event.title, format!("event {i}"));
            assert_eq!(event.done, i % 2 == 1);
        }
    }

    #[test]
    fn test_records_parse_declared_date_format() {
        let mut rows = RowSet::new(["day"]).with_row(vec![bytes("2024-01-15")]).unwrap();
        let mut events: Vec<Event> = Vec::new();
        materialize(&mut rows, Destination::records(&mut events)).unwrap();
        assert_eq!(events[0].day, day(2024, 1, 15));
    }

    #[test]
    fn test_records_replace_previous_contents() {
        let mut events = vec![Event::default(); 5];
        materialize(&mut event_rows(0), Destination::records(&mut events)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_record_failure_leaves_sequence_untouched() {
        let mut rows = event_rows(2);
        rows.push(vec![Value::Int(9), bytes("bad"), bytes("yes"), bytes("2024-01-15")])
            .unwrap();
        let mut events = vec![Event::default()];
        let err = materialize(&mut rows, Destination::records(&mut events)).unwrap_err();
        assert!(matches!(err, Error::FieldBinding { ref field, .. } if field == "done"));
        assert_eq!(events, vec![Event::default()]);
    }

    #[test]
    fn test_unknown_column_aborts() {
        let mut rows = RowSet::new(["id", "extra"])
            .with_row(vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        let mut event = Event::default();
        let err = materialize(&mut rows, Destination::record(&mut event)).unwrap_err();
        assert!(matches!(err, Error::FieldBinding { ref field, .. } if field == "extra"));
    }

    #[test]
    fn test_single_record_takes_first_row() {
        let mut event = Event::default();
        materialize(&mut event_rows(2), Destination::record(&mut event)).unwrap();
        assert_eq!(event.id, 0);
        assert_eq!(event.title, "event 0");
    }

    #[test]
    fn test_single_record_without_rows_is_untouched() {
        let original = Event {
            id: 42,
            ..Event::default()
        };
        let mut event = original.clone();
        materialize(&mut event_rows(0), Destination::record(&mut event)).unwrap();
        assert_eq!(event, original);
    }

    #[test]
    fn test_temporal_field_without_format() {
        let mut rows = RowSet::new(["at"]).with_row(vec![bytes("2024-01-15")]).unwrap();
        let mut unformatted = Unformatted::default();
        let err = materialize(&mut rows, Destination::record(&mut unformatted)).unwrap_err();
        assert!(matches!(err, Error::TemporalFormat { .. }));
    }

    #[test]
    fn test_null_into_optional_field() {
        let mut rows = RowSet::new(["at"])
            .with_row(vec![Value::Null])
            .unwrap()
            .with_row(vec![bytes("2024-02-29 08:30:00")])
            .unwrap();
        let mut stamps: Vec<Stamp> = Vec::new();
        materialize(&mut rows, Destination::records(&mut stamps)).unwrap();
        assert_eq!(stamps[0].at, None);
        assert_eq!(
            stamps[1].at,
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(8, 30, 0)
        );
    }

    #[test]
    fn test_mappings_decode_bytes() {
        let mut rows = RowSet::new(["id", "name", "blob"])
            .with_row(vec![Value::Int(1), bytes("ann"), Value::Bytes(vec![0xff])])
            .unwrap()
            .with_row(vec![Value::Int(2), bytes("bob"), Value::Null])
            .unwrap();
        let mut out = Vec::new();
        materialize(&mut rows, Destination::mappings(&mut out)).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], Value::Int(1));
        assert_eq!(out[0]["name"], Value::Text("ann".into()));
        assert_eq!(out[0]["blob"], Value::Bytes(vec![0xff]));
        assert_eq!(out[1]["name"], Value::Text("bob".into()));
        assert_eq!(out[1]["blob"], Value::Null);
    }

    #[test]
    fn test_single_mapping_keys_are_columns() {
        let mut rows = RowSet::new(["a", "b"])
            .with_row(vec![Value::Int(1), Value::Float(2.5)])
            .unwrap();
        let mut out = Mapping::new();
        materialize(&mut rows, Destination::mapping(&mut out)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["b"], Value::Float(2.5));
    }

    #[test]
    fn test_scalar_requires_one_column() {
        let mut count = 0_i64;
        let mut none = RowSet::new(Vec::<String>::new());
        assert!(matches!(
            materialize(&mut none, Destination::scalar(&mut count)),
            Err(Error::DestinationShape(_))
        ));

        let mut two = RowSet::new(["a", "b"])
            .with_row(vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        assert!(matches!(
            materialize(&mut two, Destination::scalar(&mut count)),
            Err(Error::DestinationShape(_))
        ));
    }

    #[test]
    fn test_scalar_without_rows_is_untouched() {
        let mut count = 11_i64;
        materialize(&mut RowSet::new(["n"]), Destination::scalar(&mut count)).unwrap();
        assert_eq!(count, 11);
    }

    #[test]
    fn test_scalar_coercions() {
        let mut flag = false;
        let mut rows = RowSet::new(["f"]).with_row(vec![Value::Int(1)]).unwrap();
        materialize(&mut rows, Destination::scalar(&mut flag)).unwrap();
        assert!(flag);

        let mut rows = RowSet::new(["f"]).with_row(vec![Value::Float(1.0)]).unwrap();
        assert!(matches!(
            materialize(&mut rows, Destination::scalar(&mut flag)),
            Err(Error::FieldBinding { .. })
        ));

        let mut name = String::new();
        let mut rows = RowSet::new(["name"]).with_row(vec![bytes("zed")]).unwrap();
        materialize(&mut rows, Destination::scalar(&mut name)).unwrap();
        assert_eq!(name, "zed");
    }

    #[test]
    fn test_scalar_rejects_width_mismatch() {
        let mut total = 0.0_f64;
        let mut rows = RowSet::new(["total"]).with_row(vec![Value::Int(3)]).unwrap();
        let err = materialize(&mut rows, Destination::scalar(&mut total)).unwrap_err();
        assert!(matches!(err, Error::FieldBinding { ref field, .. } if field == "total"));
    }

    #[test]
    fn test_scalar_temporal_has_no_format() {
        let mut at = day(1970, 1, 1);
        let mut rows = RowSet::new(["at"]).with_row(vec![bytes("2024-01-15")]).unwrap();
        assert!(matches!(
            materialize(&mut rows, Destination::scalar(&mut at)),
            Err(Error::TemporalFormat { .. })
        ));
    }

    #[test]
    fn test_materialize_is_repeatable() {
        let mut first: Vec<Event> = Vec::new();
        let mut second: Vec<Event> = Vec::new();
        materialize(&mut event_rows(4), Destination::records(&mut first)).unwrap();
        materialize(&mut event_rows(4), Destination::records(&mut second)).unwrap();
        assert_eq!(first, second);
    }

    struct ShortRows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    }

    impl RowSource for ShortRows {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
            Ok(if self.rows.is_empty() {
                None
            } else {
                Some(self.rows.remove(0))
            })
        }
    }

    fn short_rows() -> ShortRows {
        ShortRows {
            columns: vec!["id".to_owned(), "title".to_owned()],
            rows: vec![vec![Value::Int(1)]],
        }
    }

    #[test]
    fn test_short_row_from_custom_source_aborts() {
        let mut events: Vec<Event> = Vec::new();
        let err = materialize(&mut short_rows(), Destination::records(&mut events)).unwrap_err();
        assert!(matches!(err, Error::Scan { .. }));
        assert!(events.is_empty());

        let mut maps = Vec::new();
        let err = materialize(&mut short_rows(), Destination::mappings(&mut maps)).unwrap_err();
        assert!(matches!(err, Error::Scan { .. }));
        assert!(maps.is_empty());

        let mut map = Mapping::new();
        assert!(materialize(&mut short_rows(), Destination::mapping(&mut map)).is_err());
        assert!(map.is_empty());
    }

    /// Yields one good row, then fails if asked for more.
    struct FirstRowOnly {
        columns: Vec<String>,
        served: bool,
    }

    impl RowSource for FirstRowOnly {
        fn columns(&self) -> &[String] {
            &self.columns
        }

        fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
            if self.served {
                return Err(Error::Scan {
                    column: "id".to_owned(),
                    reason: "second row read".to_owned(),
                });
            }
            self.served = true;
            Ok(Some(vec![Value::Int(8)]))
        }
    }

    #[test]
    fn test_single_destinations_read_only_first_row() {
        let source = || FirstRowOnly {
            columns: vec!["id".to_owned()],
            served: false,
        };

        let mut event = Event::default();
        materialize(&mut source(), Destination::record(&mut event)).unwrap();
        assert_eq!(event.id, 8);

        let mut id = 0_i64;
        materialize(&mut source(), Destination::scalar(&mut id)).unwrap();
        assert_eq!(id, 8);

        let mut map = Mapping::new();
        materialize(&mut source(), Destination::mapping(&mut map)).unwrap();
        assert_eq!(map["id"], Value::Int(8));

        let mut events: Vec<Event> = Vec::new();
        assert!(materialize(&mut source(), Destination::records(&mut events)).is_err());
    }

    #[test]
    fn test_takes_single_row() {
        let mut id = 0_i64;
        let mut events: Vec<Event> = Vec::new();
        let mut maps: Vec<Mapping> = Vec::new();
        assert!(Destination::scalar(&mut id).takes_single_row());
        assert!(!Destination::records(&mut events).takes_single_row());
        assert!(!Destination::mappings(&mut maps).takes_single_row());
    }

    #[test]
    fn test_duplicate_column_names_rejected() {
        let mut rows = RowSet::new(["id", "id"])
            .with_row(vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        let mut events: Vec<Event> = Vec::new();
        let err = materialize(&mut rows, Destination::records(&mut events)).unwrap_err();
        assert!(matches!(err, Error::FieldBinding { ref field, .. } if field == "id"));
    }

    #[test]
    fn test_row_width_is_checked() {
        let mut rows = RowSet::new(["a", "b"]);
        assert!(matches!(rows.push(vec![Value::Int(1)]), Err(Error::Scan { .. })));
        assert!(rows.is_empty());
    }
}
