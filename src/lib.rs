//! # sqlx-named-map
//!
//! Named `#param` binding from a single struct or map argument, and automatic
//! materialization of MySQL result rows into structs, maps, vectors of either,
//! or a scalar, on top of SQLx.
//!
//! ## Features
//!
//! - **Named Placeholders**: Write `#name` in SQL; values come from one record or [`Mapping`]
//! - **Strict Binding**: The argument must have exactly as many fields as the template has tokens
//! - **Row Materialization**: Columns are matched to fields by name, with per-field coercion
//! - **Coercions**: integer to `bool`, formatted text to timestamp, bytes to `String`
//! - **Generic Executor Support**: Works with `MySqlPool`, `Transaction`, and connections
//!
//! ## Examples
//!
//! ### Binding and Materializing
//!
//! ```rust,no_run
//! use chrono::NaiveDateTime;
//! use sqlx_named_map::{record, Client, ClientConfig, Destination, Params};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     active: bool,
//!     created: NaiveDateTime,
//! }
//!
//! record!(User {
//!     id: i64,
//!     name: String,
//!     active: bool,
//!     created: NaiveDateTime = "%Y-%m-%d %H:%M:%S",
//! });
//!
//! #[derive(Default)]
//! struct ByName {
//!     name: String,
//! }
//!
//! record!(ByName { name: String });
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(&ClientConfig::new("mysql://localhost/test")).await?;
//!
//! let filter = ByName { name: "alice".into() };
//! let mut users: Vec<User> = Vec::new();
//! client
//!     .query(
//!         Destination::records(&mut users),
//!         "SELECT id, name, active, created FROM users WHERE name = #name",
//!         Params::record(&filter),
//!     )
//!     .await?;
//!
//! let mut count = 0_i64;
//! client
//!     .query(Destination::scalar(&mut count), "SELECT COUNT(*) FROM users", Params::None)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Using with Transactions
//!
//! ```rust,no_run
//! use sqlx_named_map::{Client, ClientConfig, Mapping, Params, Value};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::connect(&ClientConfig::new("mysql://localhost/test")).await?;
//! let mut tx = client.begin().await?;
//!
//! let mut args = Mapping::new();
//! args.insert("amount".to_owned(), Value::Int(100));
//! args.insert("id".to_owned(), Value::Int(1));
//!
//! let result = tx
//!     .execute("UPDATE accounts SET balance = balance - #amount WHERE id = #id", Params::from(&args))
//!     .await;
//! if result.is_err() {
//!     tx.fail();
//! }
//! tx.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Resolve**: [`Resolver`] rewrites `#name` tokens to `?` and collects the argument values in token order
//! 2. **Execute**: [`PreparedQuery`] binds the values to a non-persistent SQLx query
//! 3. **Materialize**: rows are scanned into raw [`Value`]s and written into a [`Destination`]
//!
//! ## Limitations
//!
//! - Only MySQL is supported
//! - Token names must match `[a-zA-Z0-9]+`; a `#` followed by an alphanumeric is always a token
//! - Numeric fields accept only `i64` and `f64`, with no widening or narrowing
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod builder;
pub mod client;
pub mod coerce;
pub mod config;
pub mod error;
pub mod materialize;
pub mod query;
pub mod query_as;
pub mod record;
pub mod value;

pub use builder::{Params, Resolved, Resolver};
pub use client::{Client, Tx};
pub use coerce::Coercion;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use materialize::{materialize, Destination, RowSet, RowSource};
pub use query::PreparedQuery;
pub use record::{FieldSpec, Record};
pub use value::{FieldKind, FieldType, Mapping, Value};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::record;
    pub use crate::{Client, ClientConfig, Destination, Mapping, Params, Record, Value};
}
