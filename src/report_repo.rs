// Weekly report persistence. Nested rollups are JSON text columns.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use crate::db::now_ms;
use crate::models::{
    DuringWeekTotals, HotHour, NewTrafficReport, ReportListItem, TrafficCount, TrafficReport,
};

pub struct ReportRepo {
    pool: SqlitePool,
}

impl ReportRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recently written report, by storage order. Its date anchors the
    /// next report window.
    pub async fn latest(&self) -> Result<Option<TrafficReport>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, scanner_id, city, road, date, total_in, total_out, during_week, hot_hours, created_at, updated_at
             FROM traffic_reports ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_report(&r)).transpose()
    }

    /// Persists a generation run's reports as one batch.
    #[instrument(skip(self, reports), fields(repo = "report", operation = "insert_reports", reports_count = reports.len()))]
    pub async fn insert_reports(&self, reports: &[NewTrafficReport]) -> Result<(), sqlx::Error> {
        if reports.is_empty() {
            return Ok(());
        }
        let now = now_ms();
        let mut tx = self.pool.begin().await?;
        for r in reports {
            let during_week = serde_json::to_string(&r.total_during_week)
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
            let hot_hours = serde_json::to_string(&r.top_five_hot_hours)
                .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
            sqlx::query(
                "INSERT INTO traffic_reports (scanner_id, city, road, date, total_in, total_out, during_week, hot_hours, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(r.scanner_id)
            .bind(&r.city)
            .bind(&r.road)
            .bind(r.date)
            .bind(r.total_per_week.cars_in)
            .bind(r.total_per_week.cars_out)
            .bind(&during_week)
            .bind(&hot_hours)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn fetch(&self, id: i64) -> Result<Option<TrafficReport>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, scanner_id, city, road, date, total_in, total_out, during_week, hot_hours, created_at, updated_at
             FROM traffic_reports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_report(&r)).transpose()
    }

    /// Paginated listing projection with optional road/date/report-id filters,
    /// plus the total matching count. Newest first.
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
        road: Option<&str>,
        date: Option<i64>,
        report_id: Option<i64>,
    ) -> Result<(Vec<ReportListItem>, i64), sqlx::Error> {
        let mut conditions = Vec::new();
        if road.is_some() {
            conditions.push("road = ?");
        }
        if date.is_some() {
            conditions.push("date = ?");
        }
        if report_id.is_some() {
            conditions.push("id = ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT id, road, date, total_in, total_out FROM traffic_reports{where_clause}
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query(&sql);
        if let Some(road) = road {
            query = query.bind(road);
        }
        if let Some(date) = date {
            query = query.bind(date);
        }
        if let Some(report_id) = report_id {
            query = query.bind(report_id);
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(ReportListItem {
                id: row.try_get("id")?,
                road: row.try_get("road")?,
                date: row.try_get("date")?,
                total_per_week: TrafficCount {
                    cars_in: row.try_get("total_in")?,
                    cars_out: row.try_get("total_out")?,
                },
            });
        }

        let count_sql = format!("SELECT COUNT(*) FROM traffic_reports{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(road) = road {
            count_query = count_query.bind(road);
        }
        if let Some(date) = date {
            count_query = count_query.bind(date);
        }
        if let Some(report_id) = report_id {
            count_query = count_query.bind(report_id);
        }
        let count = count_query.fetch_one(&self.pool).await?;

        Ok((items, count))
    }
}

fn parse_report(row: &sqlx::sqlite::SqliteRow) -> Result<TrafficReport, sqlx::Error> {
    let during_week: String = row.try_get("during_week")?;
    let hot_hours: String = row.try_get("hot_hours")?;
    let total_during_week: DuringWeekTotals =
        serde_json::from_str(&during_week).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let top_five_hot_hours: Vec<HotHour> =
        serde_json::from_str(&hot_hours).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(TrafficReport {
        id: row.try_get("id")?,
        scanner_id: row.try_get("scanner_id")?,
        city: row.try_get("city")?,
        road: row.try_get("road")?,
        date: row.try_get("date")?,
        total_per_week: TrafficCount {
            cars_in: row.try_get("total_in")?,
            cars_out: row.try_get("total_out")?,
        },
        total_during_week,
        top_five_hot_hours,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
