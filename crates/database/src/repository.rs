use crate::DbError;
use chrono::{DateTime, Utc};
use core_types::{HourlyBucket, MeasurementRecord};
use sqlx::postgres::PgPool;

/// Columns of `bbw_measurements` in `MeasurementRecord` order, cast to `float8` so
/// they decode as `f64` whatever numeric type the table uses.
const RECORD_COLUMNS: &str = r#"
    time,
    bbw_avg::float8 AS bbw_avg,
    bbw_stddev::float8 AS bbw_stddev,
    bbw_min::float8 AS bbw_min,
    bbw_max::float8 AS bbw_max,
    temperature::float8 AS temperature,
    vibration::float8 AS vibration,
    quality_flag::float8 AS quality_flag
"#;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the measurement store. It encapsulates all SQL queries.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetches every measurement for a loom since `since`, newest first.
    pub async fn get_measurements_since(
        &self,
        loom_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MeasurementRecord>, DbError> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM bbw_measurements WHERE loom_id = $1 AND time >= $2 ORDER BY time DESC"
        );
        let rows = sqlx::query_as::<_, MeasurementRecord>(&query)
            .bind(loom_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(loom_id, %since, rows = rows.len(), "Fetched recent measurements.");
        Ok(rows)
    }

    /// Fetches the measurements for a loom within `[start, end]`, oldest first.
    pub async fn get_measurements_between(
        &self,
        loom_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MeasurementRecord>, DbError> {
        let query = format!(
            "SELECT {RECORD_COLUMNS} FROM bbw_measurements WHERE loom_id = $1 AND time >= $2 AND time <= $3 ORDER BY time ASC"
        );
        let rows = sqlx::query_as::<_, MeasurementRecord>(&query)
            .bind(loom_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(loom_id, %start, %end, rows = rows.len(), "Fetched measurements for period.");
        Ok(rows)
    }

    /// Aggregates a loom's measurements since `since` into hourly buckets, oldest first.
    pub async fn get_hourly_buckets(
        &self,
        loom_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HourlyBucket>, DbError> {
        let buckets = sqlx::query_as::<_, HourlyBucket>(
            r#"
            SELECT
                date_trunc('hour', time) AS hour,
                AVG(bbw_avg)::float8 AS avg_bbw,
                AVG(bbw_stddev)::float8 AS avg_stddev,
                AVG(temperature)::float8 AS avg_temp,
                AVG(vibration)::float8 AS avg_vib
            FROM bbw_measurements
            WHERE loom_id = $1 AND time >= $2
            GROUP BY hour
            ORDER BY hour ASC
            "#,
        )
        .bind(loom_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(loom_id, %since, buckets = buckets.len(), "Fetched hourly buckets.");
        Ok(buckets)
    }
}
