// db/db.rs
use sqlx::{Pool, Postgres, Transaction};

/// Transaction handle threaded through the multi-row helpers in this module tree.
pub type PgTx<'a> = Transaction<'a, Postgres>;

#[derive(Clone)]
pub struct DBClient {
    pub pool: Pool<Postgres>,
}

impl std::fmt::Debug for DBClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DBClient")
            .field("pool_size", &self.pool.size())
            .field("idle", &self.pool.num_idle())
            .finish()
    }
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    pub async fn begin(&self) -> Result<PgTx<'static>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Opens a transaction at SERIALIZABLE isolation. Callers must be ready to
    /// retry on serialization failures (SQLSTATE 40001).
    pub async fn begin_serializable(&self) -> Result<PgTx<'static>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}
