// SQLite pool + schema init. Repos share one pool over this schema.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

pub async fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(5))
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_pool_size)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

pub async fn init(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scanners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            imei TEXT NOT NULL,
            city TEXT NOT NULL,
            road TEXT NOT NULL,
            coordinates TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One scanner per road and city, as in real life.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_scanners_city_road ON scanners(city, road)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scanners_imei ON scanners(imei)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scanner_traffic (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            imei TEXT NOT NULL,
            hour_timestamp INTEGER NOT NULL,
            traffic_in INTEGER NOT NULL,
            traffic_out INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Prevents duplicate hour rows; does not serialize concurrent increments.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_traffic_imei_hour ON scanner_traffic(imei, hour_timestamp)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS traffic_reports (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scanner_id INTEGER NOT NULL,
            city TEXT NOT NULL,
            road TEXT NOT NULL,
            date INTEGER NOT NULL,
            total_in INTEGER NOT NULL,
            total_out INTEGER NOT NULL,
            during_week TEXT NOT NULL,
            hot_hours TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reports_road_date ON traffic_reports(road, date)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
