//! Forecast ledger repository - the `baseline_forecast` table
//!
//! - insert: one row per feedback, on a connection borrowed from the
//!   default pool and returned on drop
//! - export: whole table as CSV
//! - accuracy: naive vs adjusted forecast error

use freshbites_core::{mape, to_csv, AccuracyReport, FeedbackEntry, Observation};
use sqlx::PgPool;

use super::error::GatewayError;
use super::gateway::{execute, QueryResult};

/// Ledger columns in table order; also the header of an empty export.
pub const LEDGER_COLUMNS: [&str; 6] = [
    "week",
    "sku",
    "dc",
    "naive_forecast",
    "festival_adjusted_forecast",
    "actual",
];

/// Rows shown by the sample-data endpoint.
pub const SAMPLE_SQL: &str = "SELECT * FROM baseline_forecast LIMIT 10";

const CREATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS baseline_forecast (
    week INTEGER NOT NULL,
    sku TEXT NOT NULL,
    dc TEXT NOT NULL,
    naive_forecast DOUBLE PRECISION NOT NULL,
    festival_adjusted_forecast DOUBLE PRECISION NOT NULL,
    actual DOUBLE PRECISION NOT NULL
)
"#;

const INSERT_SQL: &str = r#"
INSERT INTO baseline_forecast
    (week, sku, dc, naive_forecast, festival_adjusted_forecast, actual)
VALUES ($1, $2, $3, $4, $5, $6)
"#;

const EXPORT_SQL: &str = "SELECT * FROM baseline_forecast";

const ACCURACY_SQL: &str = r#"
SELECT naive_forecast::float8, festival_adjusted_forecast::float8, actual::float8
FROM baseline_forecast
"#;

/// Held by tests that rewrite the shared ledger table.
#[cfg(test)]
pub(crate) static TEST_LEDGER_LOCK: once_cell::sync::Lazy<tokio::sync::Mutex<()>> =
    once_cell::sync::Lazy::new(|| tokio::sync::Mutex::new(()));

/// Ledger repository
pub struct LedgerRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> LedgerRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the ledger table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<(), GatewayError> {
        tracing::info!("Ensuring baseline_forecast ledger table exists");
        sqlx::query(CREATE_SQL).execute(self.pool).await?;
        Ok(())
    }

    /// Append one feedback row.
    pub async fn insert(&self, entry: &FeedbackEntry) -> Result<(), GatewayError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(INSERT_SQL)
            .bind(i32::try_from(entry.week).unwrap_or(i32::MAX))
            .bind(&entry.sku)
            .bind(&entry.dc)
            .bind(entry.naive_forecast)
            .bind(entry.festival_adjusted_forecast)
            .bind(entry.actual)
            .execute(&mut *conn)
            .await?;

        tracing::info!(week = entry.week, sku = %entry.sku, dc = %entry.dc, "Recorded forecast feedback");
        Ok(())
    }

    /// Every ledger row, decoded like any gateway result.
    pub async fn all(&self) -> Result<QueryResult, GatewayError> {
        execute(self.pool, EXPORT_SQL, &[]).await
    }

    /// The ledger as CSV; an empty ledger yields the header line only.
    pub async fn export_csv(&self) -> Result<String, GatewayError> {
        let result = self.all().await?;
        tracing::debug!(rows = result.rows.len(), "Exporting ledger");
        Ok(to_csv(&result.rows, Some(&LEDGER_COLUMNS[..]))?)
    }

    /// Forecast error over all rows; `None` if nothing is comparable.
    pub async fn accuracy(&self) -> Result<Option<AccuracyReport>, GatewayError> {
        let rows: Vec<(Option<f64>, Option<f64>, Option<f64>)> =
            sqlx::query_as(ACCURACY_SQL).fetch_all(self.pool).await?;

        let observations: Vec<Observation> = rows
            .into_iter()
            .filter_map(|(naive, adjusted, actual)| {
                Some(Observation {
                    naive: naive?,
                    adjusted: adjusted?,
                    actual: actual?,
                })
            })
            .collect();

        Ok(mape(&observations))
    }
}
