use sqlx::mysql::MySqlPoolOptions;

use crate::error::{Error, Result};

/// Default number of connections kept warm in the pool.
pub const DEFAULT_MAX_IDLE: u32 = 10;
/// Default upper bound on open connections.
pub const DEFAULT_MAX_OPEN: u32 = 100;

/// Connection settings for [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub max_idle: u32,
    pub max_open: u32,
}

impl ClientConfig {
    /// Config for `url` with the default pool limits.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_idle: DEFAULT_MAX_IDLE,
            max_open: DEFAULT_MAX_OPEN,
        }
    }

    #[must_use]
    pub fn with_max_idle(mut self, max_idle: u32) -> Self {
        self.max_idle = max_idle;
        self
    }

    #[must_use]
    pub fn with_max_open(mut self, max_open: u32) -> Self {
        self.max_open = max_open;
        self
    }

    /// Reads `DATABASE_URL`, and optionally `DATABASE_MAX_IDLE` and
    /// `DATABASE_MAX_OPEN`, after loading a `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is missing or a limit is not a
    /// non-negative integer.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let url = dotenvy::var("DATABASE_URL")
            .map_err(|e| Error::Config(format!("DATABASE_URL: {e}")))?;
        Self::new(url).with_limits(
            dotenvy::var("DATABASE_MAX_IDLE").ok().as_deref(),
            dotenvy::var("DATABASE_MAX_OPEN").ok().as_deref(),
        )
    }

    fn with_limits(mut self, max_idle: Option<&str>, max_open: Option<&str>) -> Result<Self> {
        if let Some(raw) = max_idle {
            self.max_idle = parse_limit("DATABASE_MAX_IDLE", raw)?;
        }
        if let Some(raw) = max_open {
            self.max_open = parse_limit("DATABASE_MAX_OPEN", raw)?;
        }
        Ok(self)
    }

    /// Pool options for these limits. SQLx has no idle cap, so the idle
    /// count becomes the pool's minimum size, never above `max_open`.
    #[must_use]
    pub fn pool_options(&self) -> MySqlPoolOptions {
        MySqlPoolOptions::new()
            .max_connections(self.max_open)
            .min_connections(self.max_idle.min(self.max_open))
    }
}

fn parse_limit(name: &str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{name}={raw:?}: {e}")))
}
