// Bucket store: per-scanner, per-hour traffic aggregates.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use std::collections::HashMap;
use tracing::instrument;

use crate::db::now_ms;
use crate::models::{NewBucket, TrafficBucket, TrafficCount};

pub struct TrafficRepo {
    pool: SqlitePool,
}

impl TrafficRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recently persisted bucket for an imei, by storage order.
    pub async fn latest_bucket(&self, imei: &str) -> Result<Option<TrafficBucket>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, imei, hour_timestamp, traffic_in, traffic_out, created_at, updated_at
             FROM scanner_traffic WHERE imei = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(imei)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_bucket(&r)).transpose()
    }

    /// Adds counts onto an existing bucket row. In-place SQL increment, so
    /// two concurrent merges into the same row cannot lose counts.
    #[instrument(skip(self), fields(repo = "traffic", operation = "add_to_bucket"))]
    pub async fn add_to_bucket(&self, id: i64, add: TrafficCount) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE scanner_traffic
             SET traffic_in = traffic_in + $1, traffic_out = traffic_out + $2, updated_at = $3
             WHERE id = $4",
        )
        .bind(add.cars_in)
        .bind(add.cars_out)
        .bind(now_ms())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self, buckets), fields(repo = "traffic", operation = "insert_buckets", buckets_count = buckets.len()))]
    pub async fn insert_buckets(&self, buckets: &[NewBucket]) -> Result<(), sqlx::Error> {
        if buckets.is_empty() {
            return Ok(());
        }
        let now = now_ms();
        let mut tx = self.pool.begin().await?;
        for b in buckets {
            sqlx::query(
                "INSERT INTO scanner_traffic (imei, hour_timestamp, traffic_in, traffic_out, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&b.imei)
            .bind(b.hour_timestamp)
            .bind(b.traffic.cars_in)
            .bind(b.traffic.cars_out)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Buckets with hour_timestamp in [from_ts, to_ts). Order: hour ascending.
    pub async fn buckets_in_range(
        &self,
        from_ts: i64,
        to_ts: i64,
    ) -> Result<Vec<TrafficBucket>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, imei, hour_timestamp, traffic_in, traffic_out, created_at, updated_at
             FROM scanner_traffic WHERE hour_timestamp >= $1 AND hour_timestamp < $2
             ORDER BY hour_timestamp ASC",
        )
        .bind(from_ts)
        .bind(to_ts)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(parse_bucket(&row)?);
        }
        Ok(out)
    }

    /// Latest bucket write time per imei, in one grouped query.
    pub async fn last_seen_by_imei(
        &self,
        imeis: &[&str],
    ) -> Result<HashMap<String, i64>, sqlx::Error> {
        if imeis.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; imeis.len()].join(", ");
        let sql = format!(
            "SELECT imei, MAX(created_at) AS last_seen FROM scanner_traffic
             WHERE imei IN ({placeholders}) GROUP BY imei"
        );
        let mut query = sqlx::query(&sql);
        for imei in imeis {
            query = query.bind(*imei);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = HashMap::with_capacity(rows.len());
        for row in rows {
            let imei: String = row.try_get("imei")?;
            let last_seen: i64 = row.try_get("last_seen")?;
            out.insert(imei, last_seen);
        }
        Ok(out)
    }
}

fn parse_bucket(row: &sqlx::sqlite::SqliteRow) -> Result<TrafficBucket, sqlx::Error> {
    Ok(TrafficBucket {
        id: row.try_get("id")?,
        imei: row.try_get("imei")?,
        hour_timestamp: row.try_get("hour_timestamp")?,
        traffic: TrafficCount {
            cars_in: row.try_get("traffic_in")?,
            cars_out: row.try_get("traffic_out")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
