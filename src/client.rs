use sqlx::mysql::{MySqlPool, MySqlQueryResult};
use sqlx::{MySql, Transaction};
use tracing::debug;

use crate::builder::{Params, Resolver};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::materialize::Destination;
use crate::query::PreparedQuery;

/// A MySQL pool paired with a named-token resolver.
#[derive(Debug, Clone)]
pub struct Client {
    pool: MySqlPool,
    resolver: Resolver,
}

impl Client {
    /// Opens a pool with the configured limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot connect.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let pool = config.pool_options().connect(&config.url).await?;
        Self::with_pool(pool)
    }

    /// Wraps an existing pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`](crate::Error::Parse) if the token pattern fails to compile.
    pub fn with_pool(pool: MySqlPool) -> Result<Self> {
        Ok(Self {
            pool,
            resolver: Resolver::new()?,
        })
    }

    #[must_use]
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Runs a named statement for its side effects.
    ///
    /// # Errors
    ///
    /// Resolution and database errors.
    pub async fn execute(&self, template: &str, params: Params<'_>) -> Result<MySqlQueryResult> {
        PreparedQuery::new(&self.resolver, template, params)?
            .execute(&self.pool)
            .await
    }

    /// Runs a named query and materializes its rows into `destination`.
    ///
    /// # Errors
    ///
    /// Resolution, database and materialization errors.
    pub async fn query(
        &self,
        destination: Destination<'_>,
        template: &str,
        params: Params<'_>,
    ) -> Result<()> {
        PreparedQuery::new(&self.resolver, template, params)?
            .fetch_into(&self.pool, destination)
            .await
    }

    /// Starts a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if `BEGIN` fails.
    pub async fn begin(&self) -> Result<Tx> {
        let inner = self.pool.begin().await?;
        Ok(Tx {
            inner,
            resolver: self.resolver.clone(),
            success: true,
        })
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// A transaction that commits on [`close`](Tx::close) unless it was marked
/// failed. Dropping it without closing rolls back.
pub struct Tx {
    inner: Transaction<'static, MySql>,
    resolver: Resolver,
    success: bool,
}

impl Tx {
    /// Same as [`Client::execute`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Resolution and database errors.
    pub async fn execute(&mut self, template: &str, params: Params<'_>) -> Result<MySqlQueryResult> {
        PreparedQuery::new(&self.resolver, template, params)?
            .execute(&mut *self.inner)
            .await
    }

    /// Same as [`Client::query`], inside the transaction.
    ///
    /// # Errors
    ///
    /// Resolution, database and materialization errors.
    pub async fn query(
        &mut self,
        destination: Destination<'_>,
        template: &str,
        params: Params<'_>,
    ) -> Result<()> {
        PreparedQuery::new(&self.resolver, template, params)?
            .fetch_into(&mut self.inner, destination)
            .await
    }

    /// Marks the transaction so that [`close`](Tx::close) rolls back.
    pub fn fail(&mut self) {
        self.success = false;
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        !self.success
    }

    /// Commits, or rolls back if [`fail`](Tx::fail) was called.
    ///
    /// # Errors
    ///
    /// Returns an error if `COMMIT` or `ROLLBACK` fails.
    pub async fn close(self) -> Result<()> {
        if self.success {
            debug!("committing transaction");
            self.inner.commit().await?;
        } else {
            debug!("rolling back failed transaction");
            self.inner.rollback().await?;
        }
        Ok(())
    }
}
