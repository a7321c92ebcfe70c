// Shared test helpers
#![allow(dead_code)]

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;
use trafficwatch::db;
use trafficwatch::models::*;
use trafficwatch::scanner_repo::ScannerRepo;
use trafficwatch::traffic_repo::TrafficRepo;

/// Fresh SQLite database in a temp dir with the schema applied. The TempDir
/// must stay alive for the pool's lifetime.
pub async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let pool = db::connect(path.to_str().unwrap(), 2).await.unwrap();
    db::init(&pool).await.unwrap();
    (dir, pool)
}

pub fn new_scanner(imei: &str, city: &str, road: &str) -> NewScanner {
    NewScanner {
        name: format!("scanner-{imei}"),
        imei: imei.into(),
        city: city.into(),
        road: road.into(),
        coordinates: "52.2297, 21.0122".into(),
        status: ScannerStatus::Active,
    }
}

pub async fn insert_scanner(repo: &ScannerRepo, imei: &str, city: &str, road: &str) -> Scanner {
    repo.create(&new_scanner(imei, city, road)).await.unwrap()
}

pub fn scan(timestamp: i64, cars_in: i64, cars_out: i64) -> RawScan {
    RawScan {
        timestamp,
        traffic: TrafficCount { cars_in, cars_out },
    }
}

pub fn bucket(imei: &str, hour_timestamp: i64, cars_in: i64, cars_out: i64) -> TrafficBucket {
    TrafficBucket {
        id: 0,
        imei: imei.into(),
        hour_timestamp,
        traffic: TrafficCount { cars_in, cars_out },
        created_at: hour_timestamp,
        updated_at: hour_timestamp,
    }
}

pub async fn insert_bucket(repo: &TrafficRepo, imei: &str, hour_timestamp: i64, cars_in: i64, cars_out: i64) {
    repo.insert_buckets(&[NewBucket {
        imei: imei.into(),
        hour_timestamp,
        traffic: TrafficCount { cars_in, cars_out },
    }])
    .await
    .unwrap();
}

/// Rewrites a scanner's created_at, for liveness tests against old scanners.
pub async fn backdate_scanner(pool: &SqlitePool, id: i64, created_at: i64) {
    sqlx::query("UPDATE scanners SET created_at = $1 WHERE id = $2")
        .bind(created_at)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

/// Rewrites bucket write times for one imei, for last-seen tests.
pub async fn backdate_buckets(pool: &SqlitePool, imei: &str, created_at: i64) {
    sqlx::query("UPDATE scanner_traffic SET created_at = $1 WHERE imei = $2")
        .bind(created_at)
        .bind(imei)
        .execute(pool)
        .await
        .unwrap();
}
