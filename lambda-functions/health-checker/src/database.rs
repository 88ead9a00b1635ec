//! MySQL access to the `runAudits` table

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::models::AuditRow;
use crate::secrets::DbCredentials;

/// Rows for one function whose start time falls on the bound date prefix.
const PRIOR_DAY_ROWS: &str = "\
    SELECT CAST(run_id AS CHAR) AS run_id, function_name, function_start_time, \
    records_written, records_read, status \
    FROM runAudits \
    WHERE function_name = ? AND function_start_time LIKE ?";

#[async_trait]
pub trait AuditStore: Send + Sync {
    /// All audit rows recorded for `function_name` on `date` (UTC).
    async fn fetch_rows(&self, function_name: &str, date: NaiveDate) -> Result<Vec<AuditRow>>;
}

pub fn date_prefix(date: NaiveDate) -> String {
    format!("{}%", date.format("%Y-%m-%d"))
}

#[derive(Clone)]
pub struct MySqlAuditStore {
    pool: MySqlPool,
}

impl MySqlAuditStore {
    /// Open the connection pool. Connects eagerly so bad credentials surface at cold start.
    pub async fn connect(credentials: &DbCredentials, pool_size: u32) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .connect_with(options)
            .await
            .inspect_err(|e| error!("Failed to open database pool: {}", e))?;

        debug!("Database connection pool initialized with {} connections", pool_size);
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MySqlAuditStore {
    #[tracing::instrument(skip(self))]
    async fn fetch_rows(&self, function_name: &str, date: NaiveDate) -> Result<Vec<AuditRow>> {
        info!("Getting database rows for {} on {}", function_name, date);

        // The connection returns to the pool when `tx` drops, on every path.
        let mut tx = self.pool.begin().await.inspect_err(|e| {
            error!("Failed to acquire database connection: {}", e);
        })?;

        let result = sqlx::query_as::<_, AuditRow>(PRIOR_DAY_ROWS)
            .bind(function_name)
            .bind(date_prefix(date))
            .fetch_all(&mut *tx)
            .await;

        match result {
            Ok(rows) => {
                tx.commit().await?;
                debug!("Transaction committed, {} rows", rows.len());
                Ok(rows)
            }
            Err(e) => {
                error!("Failed to query rows for {}: {}", function_name, e);
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback failed: {}", rollback);
                }
                Err(e.into())
            }
        }
    }
}
