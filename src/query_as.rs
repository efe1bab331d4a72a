use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::MySqlRow;
use sqlx::types::{Decimal, JsonValue};
use sqlx::{Acquire, Column, Executor, MySql, Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::error::{Error, Result};
use crate::materialize::{materialize, Destination, RowSet};
use crate::query::{bind_all, PreparedQuery};
use crate::value::Value;

impl PreparedQuery {
    /// Runs the query and writes its rows into `destination`.
    ///
    /// The statement is described on the same connection first so the column
    /// list is known even when no row comes back. Neither the description nor
    /// the query leaves a statement in the connection's cache. Scalar, record
    /// and mapping destinations fetch at most one row.
    ///
    /// # Arguments
    ///
    /// * `db` - Anything SQLx can acquire a connection from (pool, transaction, connection)
    /// * `destination` - Scalar, record, mapping, or a sequence of either
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, a column cannot be scanned, or a
    /// row cannot be materialized into `destination`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use sqlx::MySqlPool;
    /// use sqlx_named_map::{record, Destination, Mapping, PreparedQuery, Resolver, Value, Params};
    ///
    /// #[derive(Debug, Default)]
    /// struct User {
    ///     id: i64,
    ///     name: String,
    /// }
    ///
    /// record!(User { id: i64, name: String });
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
    /// let resolver = Resolver::new()?;
    /// let mut args = Mapping::new();
    /// args.insert("age".to_owned(), Value::Int(18));
    ///
    /// let query = PreparedQuery::new(
    ///     &resolver,
    ///     "SELECT id, name FROM users WHERE age >= #age",
    ///     Params::from(&args),
    /// )?;
    ///
    /// let mut users: Vec<User> = Vec::new();
    /// query.fetch_into(&pool, Destination::records(&mut users)).await?;
    /// println!("Found {} users", users.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_into<'c, A>(&self, db: A, destination: Destination<'_>) -> Result<()>
    where
        A: Acquire<'c, Database = MySql>,
    {
        let mut conn = db.acquire().await?;
        let described = (&mut *conn).describe(self.sql.as_str()).await?;
        let columns: Vec<String> = described
            .columns()
            .iter()
            .map(|column| column.name().to_owned())
            .collect();
        let single = destination.takes_single_row();
        debug!(sql = %self.sql, args = self.args.len(), columns = columns.len(), single, "querying statement");

        let q = bind_all(sqlx::query::<MySql>(&self.sql).persistent(false), &self.args);
        let mut cursor = RowSet::new(columns);
        if single {
            if let Some(row) = q.fetch_optional(&mut *conn).await? {
                cursor.push(scan_row(&row)?)?;
            }
        } else {
            for row in q.fetch_all(&mut *conn).await? {
                cursor.push(scan_row(&row)?)?;
            }
        }
        materialize(&mut cursor, destination)
    }
}

/// How a driver column is read into a raw [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawKind {
    Signed,
    Unsigned,
    Year,
    Bit,
    Float,
    Double,
    Decimal,
    Json,
    DateTime,
    Date,
    Time,
    Bytes,
}

/// Classifies a MySQL type name as reported by SQLx.
fn raw_kind(type_name: &str) -> RawKind {
    match type_name {
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => RawKind::Signed,
        name if name.ends_with(" UNSIGNED") => RawKind::Unsigned,
        "YEAR" => RawKind::Year,
        "BIT" => RawKind::Bit,
        "FLOAT" => RawKind::Float,
        "DOUBLE" => RawKind::Double,
        "DECIMAL" => RawKind::Decimal,
        "JSON" => RawKind::Json,
        "DATETIME" | "TIMESTAMP" => RawKind::DateTime,
        "DATE" => RawKind::Date,
        "TIME" => RawKind::Time,
        _ => RawKind::Bytes,
    }
}

/// Converts a driver row into raw values: integers as `Int`, floating point
/// as `Float`, temporal, decimal and JSON columns rendered as MySQL text,
/// everything else as the column's bytes.
pub(crate) fn scan_row(row: &MySqlRow) -> Result<Vec<Value>> {
    (0..row.len()).map(|index| scan_column(row, index)).collect()
}

fn scan_column(row: &MySqlRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw_kind(raw.type_info().name());

    let value = match kind {
        RawKind::Signed => Value::Int(row.try_get::<i64, _>(index)?),
        RawKind::Unsigned => narrow(row, index, row.try_get::<u64, _>(index)?)?,
        RawKind::Year => Value::Int(i64::from(row.try_get_unchecked::<u16, _>(index)?)),
        RawKind::Bit => {
            let bits = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            if bits.len() > 8 {
                return Err(Error::Scan {
                    column: column_name(row, index),
                    reason: format!("BIT value of {} bytes exceeds 64 bits", bits.len()),
                });
            }
            let folded = bits.iter().fold(0_u64, |acc, &b| (acc << 8) | u64::from(b));
            narrow(row, index, folded)?
        }
        RawKind::Float => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        RawKind::Double => Value::Float(row.try_get::<f64, _>(index)?),
        RawKind::Decimal => text(row.try_get::<Decimal, _>(index)?.to_string()),
        RawKind::Json => text(row.try_get::<JsonValue, _>(index)?.to_string()),
        RawKind::DateTime => {
            let datetime = row.try_get::<NaiveDateTime, _>(index)?;
            text(datetime.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }
        RawKind::Date => text(row.try_get::<NaiveDate, _>(index)?.format("%Y-%m-%d").to_string()),
        RawKind::Time => text(row.try_get::<NaiveTime, _>(index)?.format("%H:%M:%S%.f").to_string()),
        RawKind::Bytes => match row.try_get::<Vec<u8>, _>(index) {
            Ok(bytes) => Value::Bytes(bytes),
            Err(_) => text(row.try_get::<String, _>(index)?),
        },
    };
    Ok(value)
}

fn text(rendered: String) -> Value {
    Value::Bytes(rendered.into_bytes())
}

/// Unsigned values above `i64::MAX` do not fit `Int`.
fn narrow(row: &MySqlRow, index: usize, unsigned: u64) -> Result<Value> {
    i64::try_from(unsigned)
        .map(Value::Int)
        .map_err(|e| Error::Scan {
            column: column_name(row, index),
            reason: e.to_string(),
        })
}

fn column_name(row: &MySqlRow, index: usize) -> String {
    row.columns()
        .get(index)
        .map_or_else(|| index.to_string(), |column| column.name().to_owned())
}
