use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::value::{Mapping, Value};

/// Sentinel that starts a named token.
pub const TOKEN_PREFIX: char = '#';

/// Pattern matched by a named token: the sentinel plus an alphanumeric run.
pub const TOKEN_PATTERN: &str = r"#[a-zA-Z0-9]+";

/// Positional placeholder understood by MySQL.
pub const PLACEHOLDER: &str = "?";

/// The single argument a template is bound from.
#[derive(Clone, Copy)]
pub enum Params<'a> {
    /// No argument; only valid for templates without tokens.
    None,
    /// A struct implementing [`Record`]; tokens name its fields.
    Record(&'a dyn Record),
    /// A keyed mapping; tokens name its keys.
    Mapping(&'a Mapping),
    /// Already-positional values. Rejected whenever the template has tokens.
    Positional(&'a [Value]),
}

impl<'a> Params<'a> {
    pub fn record<R: Record>(record: &'a R) -> Self {
        Params::Record(record)
    }

    fn shape(&self) -> &'static str {
        match self {
            Params::None => "none",
            Params::Record(_) => "record",
            Params::Mapping(_) => "mapping",
            Params::Positional(_) => "positional list",
        }
    }
}

impl<'a> From<&'a Mapping> for Params<'a> {
    fn from(mapping: &'a Mapping) -> Self {
        Params::Mapping(mapping)
    }
}

impl<'a> From<&'a [Value]> for Params<'a> {
    fn from(values: &'a [Value]) -> Self {
        Params::Positional(values)
    }
}

impl std::fmt::Debug for Params<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.shape())
    }
}

/// Output of [`Resolver::resolve`]: positional SQL plus its ordered arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Rewrites `#name` tokens into positional placeholders and pulls the
/// matching argument values out of a record or mapping.
///
/// The token pattern is compiled once in [`Resolver::new`]; cloning a
/// resolver shares the compiled program.
///
/// # Examples
///
/// ```
/// use sqlx_named_map::{Mapping, Params, Resolver, Value};
///
/// let resolver = Resolver::new()?;
/// let mut args = Mapping::new();
/// args.insert("id".to_owned(), Value::Int(7));
///
/// let resolved = resolver.resolve("SELECT * FROM t WHERE id = #id", Params::from(&args))?;
/// assert_eq!(resolved.sql, "SELECT * FROM t WHERE id = ?");
/// assert_eq!(resolved.args, vec![Value::Int(7)]);
/// # Ok::<(), sqlx_named_map::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    pattern: Regex,
}

impl Resolver {
    /// Compiles the token pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(TOKEN_PATTERN)?,
        })
    }

    /// Token occurrences in left-to-right order, duplicates included.
    #[must_use]
    pub fn tokens<'t>(&self, template: &'t str) -> Vec<&'t str> {
        self.pattern.find_iter(template).map(|m| m.as_str()).collect()
    }

    /// Replaces every token with [`PLACEHOLDER`], leaving other text intact.
    #[must_use]
    pub fn build_query(&self, template: &str) -> String {
        self.pattern.replace_all(template, PLACEHOLDER).into_owned()
    }

    /// Resolves a named template against one argument source.
    ///
    /// The number of token occurrences must equal the record's field count
    /// or the mapping's key count. Booleans are bound as 1/0.
    ///
    /// # Errors
    ///
    /// - [`Error::TemplateArgumentMismatch`] on a count mismatch
    /// - [`Error::UnboundPlaceholder`] when a token names a missing field or key
    /// - [`Error::UnsupportedArgumentShape`] for positional arguments
    pub fn resolve(&self, template: &str, params: Params<'_>) -> Result<Resolved> {
        let tokens = self.tokens(template);
        let sql = self.build_query(template);

        if tokens.is_empty() {
            trace!(params = ?params, "template has no named tokens");
            return Ok(Resolved { sql, args: Vec::new() });
        }

        let args = match params {
            Params::None => {
                return Err(Error::TemplateArgumentMismatch {
                    tokens: tokens.len(),
                    fields: 0,
                })
            }
            Params::Record(record) => {
                check_count(tokens.len(), record.fields().len())?;
                collect_args(&tokens, |name| record.get(name))?
            }
            Params::Mapping(mapping) => {
                check_count(tokens.len(), mapping.len())?;
                collect_args(&tokens, |name| mapping.get(name).cloned())?
            }
            Params::Positional(_) => {
                return Err(Error::UnsupportedArgumentShape(
                    "named templates must be bound from a record or a mapping",
                ))
            }
        };

        trace!(tokens = tokens.len(), params = ?params, "resolved named template");
        Ok(Resolved { sql, args })
    }
}

fn check_count(tokens: usize, fields: usize) -> Result<()> {
    if tokens == fields {
        Ok(())
    } else {
        Err(Error::TemplateArgumentMismatch { tokens, fields })
    }
}

fn collect_args<F>(tokens: &[&str], mut lookup: F) -> Result<Vec<Value>>
where
    F: FnMut(&str) -> Option<Value>,
{
    tokens
        .iter()
        .map(|token| {
            let name = token.trim_start_matches(TOKEN_PREFIX);
            lookup(name)
                .map(Value::into_wire)
                .ok_or_else(|| Error::UnboundPlaceholder(name.to_owned()))
        })
        .collect()
}
