use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::{mysql::MySqlQueryResult, Executor, MySql};
use tracing::debug;

use crate::builder::{Params, Resolver};
use crate::value::Value;

/// Type alias for SQLx Query with MySQL arguments
pub type Q<'q> = Query<'q, MySql, MySqlArguments>;

/// A named template resolved against its argument, ready to run.
///
/// `PreparedQuery` holds the positional SQL and the argument values in token
/// order. Every run builds a fresh, non-persistent SQLx query, so the driver
/// closes the statement handle once the call finishes instead of caching it.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::MySqlPool;
/// use sqlx_named_map::{record, Params, PreparedQuery, Resolver};
///
/// #[derive(Default)]
/// struct NewUser {
///     name: String,
///     active: bool,
/// }
///
/// record!(NewUser { name: String, active: bool });
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let resolver = Resolver::new()?;
/// let user = NewUser { name: "John Doe".into(), active: true };
///
/// let query = PreparedQuery::new(
///     &resolver,
///     "INSERT INTO users (name, active) VALUES (#name, #active)",
///     Params::record(&user),
/// )?;
///
/// let result = query.execute(&pool).await?;
/// println!("Inserted {} rows", result.rows_affected());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub(crate) sql: String,
    pub(crate) args: Vec<Value>,
}

impl PreparedQuery {
    /// Resolves `template` against `params`.
    ///
    /// # Errors
    ///
    /// Any error from [`Resolver::resolve`].
    pub fn new(resolver: &Resolver, template: &str, params: Params<'_>) -> crate::Result<Self> {
        let resolved = resolver.resolve(template, params)?;
        Ok(Self {
            sql: resolved.sql,
            args: resolved.args,
        })
    }

    /// Positional SQL sent to the driver.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Arguments in placeholder order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Executes the statement for its side effects.
    ///
    /// Works with any SQLx `Executor`: `&MySqlPool`, `&mut *transaction`,
    /// `&mut MySqlConnection`.
    ///
    /// # Returns
    ///
    /// The MySQL query result with affected rows and last insert id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn execute<'e, E>(&self, executor: E) -> crate::Result<MySqlQueryResult>
    where
        E: Executor<'e, Database = MySql>,
    {
        debug!(sql = %self.sql, args = self.args.len(), "executing statement");
        let q = bind_all(sqlx::query::<MySql>(&self.sql).persistent(false), &self.args);
        Ok(q.execute(executor).await?)
    }
}

/// Binds every argument in order.
pub(crate) fn bind_all<'q>(mut q: Q<'q>, args: &[Value]) -> Q<'q> {
    for arg in args {
        q = bind_value(q, arg);
    }
    q
}

fn bind_value<'q>(q: Q<'q>, value: &Value) -> Q<'q> {
    match value {
        Value::Null => q.bind(None::<String>),
        Value::Int(i) => q.bind(*i),
        Value::Float(f) => q.bind(*f),
        Value::Bool(b) => q.bind(i64::from(*b)),
        Value::Text(s) => q.bind(s.clone()),
        Value::Bytes(b) => q.bind(b.clone()),
        Value::DateTime(dt) => q.bind(*dt),
    }
}
