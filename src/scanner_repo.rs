// Scanner persistence: reads, status writes, administrative create/edit.

use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use tracing::instrument;

use crate::db::now_ms;
use crate::models::{NewScanner, Scanner, ScannerBasic, ScannerListItem, ScannerStatus};

pub struct ScannerRepo {
    pool: SqlitePool,
}

impl ScannerRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, new), fields(repo = "scanner", operation = "create", city = %new.city, road = %new.road))]
    pub async fn create(&self, new: &NewScanner) -> Result<Scanner, sqlx::Error> {
        let now = now_ms();
        let result = sqlx::query(
            "INSERT INTO scanners (name, imei, city, road, coordinates, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&new.name)
        .bind(&new.imei)
        .bind(&new.city)
        .bind(&new.road)
        .bind(&new.coordinates)
        .bind(new.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Scanner {
            id: result.last_insert_rowid(),
            name: new.name.clone(),
            imei: new.imei.clone(),
            city: new.city.clone(),
            road: new.road.clone(),
            coordinates: new.coordinates.clone(),
            status: new.status,
            created_at: now,
            updated_at: now,
        })
    }

    /// Id of an existing scanner on the same (city, road), if any.
    pub async fn find_by_city_road(
        &self,
        city: &str,
        road: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row = sqlx::query("SELECT id FROM scanners WHERE city = $1 AND road = $2 LIMIT 1")
            .bind(city)
            .bind(road)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.try_get("id")).transpose()
    }

    pub async fn fetch(&self, id: i64) -> Result<Option<Scanner>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, name, imei, city, road, coordinates, status, created_at, updated_at
             FROM scanners WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_scanner(&r)).transpose()
    }

    pub async fn fetch_by_imei(&self, imei: &str) -> Result<Option<Scanner>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, name, imei, city, road, coordinates, status, created_at, updated_at
             FROM scanners WHERE imei = $1 LIMIT 1",
        )
        .bind(imei)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| parse_scanner(&r)).transpose()
    }

    pub async fn fetch_by_imeis(&self, imeis: &[&str]) -> Result<Vec<Scanner>, sqlx::Error> {
        if imeis.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; imeis.len()].join(", ");
        let sql = format!(
            "SELECT id, name, imei, city, road, coordinates, status, created_at, updated_at
             FROM scanners WHERE imei IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql);
        for imei in imeis {
            query = query.bind(*imei);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(parse_scanner(&row)?);
        }
        Ok(out)
    }

    pub async fn all(&self) -> Result<Vec<Scanner>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, name, imei, city, road, coordinates, status, created_at, updated_at
             FROM scanners ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(parse_scanner(&row)?);
        }
        Ok(out)
    }

    /// Paginated listing projection with optional city/road filters, plus the
    /// total matching count. Newest first.
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
        city: Option<&str>,
        road: Option<&str>,
    ) -> Result<(Vec<ScannerListItem>, i64), sqlx::Error> {
        let mut conditions = Vec::new();
        if city.is_some() {
            conditions.push("city = ?");
        }
        if road.is_some() {
            conditions.push("road = ?");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT id, name, city, road, coordinates, status FROM scanners{where_clause}
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query(&sql);
        if let Some(city) = city {
            query = query.bind(city);
        }
        if let Some(road) = road {
            query = query.bind(road);
        }
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(ScannerListItem {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                city: row.try_get("city")?,
                road: row.try_get("road")?,
                coordinates: row.try_get("coordinates")?,
                status: parse_status(&row)?,
            });
        }

        let count_sql = format!("SELECT COUNT(*) FROM scanners{where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(city) = city {
            count_query = count_query.bind(city);
        }
        if let Some(road) = road {
            count_query = count_query.bind(road);
        }
        let count = count_query.fetch_one(&self.pool).await?;

        Ok((items, count))
    }

    /// Basic projection page for proximity queries. last_seen starts empty;
    /// the caller enriches it from the bucket store.
    pub async fn list_basic(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ScannerBasic>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT id, imei, coordinates, status FROM scanners
             ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(ScannerBasic {
                id: row.try_get("id")?,
                imei: row.try_get("imei")?,
                coordinates: row.try_get("coordinates")?,
                status: parse_status(&row)?,
                last_seen: None,
            });
        }
        Ok(out)
    }

    #[instrument(skip(self), fields(repo = "scanner", operation = "update_status", scanner_id = id, status = %status))]
    pub async fn update_status(&self, id: i64, status: ScannerStatus) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE scanners SET status = $1, updated_at = $2 WHERE id = $3")
            .bind(status.as_str())
            .bind(now_ms())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Edits the replaceable-hardware fields (name, imei). City and road are
    /// fixed for a scanner's lifetime.
    #[instrument(skip(self, name, imei), fields(repo = "scanner", operation = "update_details", scanner_id = id))]
    pub async fn update_details(
        &self,
        id: i64,
        name: &str,
        imei: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE scanners SET name = $1, imei = $2, updated_at = $3 WHERE id = $4")
            .bind(name)
            .bind(imei)
            .bind(now_ms())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn parse_status(row: &sqlx::sqlite::SqliteRow) -> Result<ScannerStatus, sqlx::Error> {
    let status: String = row.try_get("status")?;
    ScannerStatus::parse(&status)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown scanner status: {status}").into()))
}

fn parse_scanner(row: &sqlx::sqlite::SqliteRow) -> Result<Scanner, sqlx::Error> {
    Ok(Scanner {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        imei: row.try_get("imei")?,
        city: row.try_get("city")?,
        road: row.try_get("road")?,
        coordinates: row.try_get("coordinates")?,
        status: parse_status(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
