// Ingestor tests: hour bucketing, latest-bucket merge, status recovery

mod common;

use std::sync::Arc;
use trafficwatch::error::ApiError;
use trafficwatch::events::{self, DataChange};
use trafficwatch::ingest::{self, Ingestor};
use trafficwatch::models::ScannerStatus;
use trafficwatch::scanner_repo::ScannerRepo;
use trafficwatch::traffic_repo::TrafficRepo;

// 2024-01-01 (Monday), unix seconds.
const HOUR_10: i64 = 1_704_103_200;
const HOUR_11: i64 = 1_704_106_800;
const HOUR_10_MS: i64 = HOUR_10 * 1000;
const HOUR_11_MS: i64 = HOUR_11 * 1000;

async fn setup() -> (
    tempfile::TempDir,
    Arc<ScannerRepo>,
    Arc<TrafficRepo>,
    Ingestor,
    tokio::sync::broadcast::Sender<DataChange>,
) {
    let (dir, pool) = common::test_pool().await;
    let scanners = Arc::new(ScannerRepo::new(pool.clone()));
    let traffic = Arc::new(TrafficRepo::new(pool));
    let events = events::channel(8);
    let ingestor = Ingestor::new(scanners.clone(), traffic.clone(), events.clone());
    (dir, scanners, traffic, ingestor, events)
}

#[test]
fn hour_floor_is_start_of_hour_in_ms() {
    assert_eq!(ingest::hour_floor_ms(HOUR_10), HOUR_10_MS);
    assert_eq!(ingest::hour_floor_ms(HOUR_10 + 900), HOUR_10_MS);
    assert_eq!(ingest::hour_floor_ms(HOUR_10 + 3599), HOUR_10_MS);
    assert_eq!(ingest::hour_floor_ms(HOUR_10 + 3600), HOUR_11_MS);
}

#[test]
fn grouping_sums_per_hour_and_counts_scans() {
    let scans = vec![
        common::scan(HOUR_10 + 900, 3, 1),  // 10:15
        common::scan(HOUR_10 + 2700, 2, 0), // 10:45
        common::scan(HOUR_11 + 300, 1, 1),  // 11:05
    ];
    let grouped = ingest::group_scans_by_hour(&scans);
    assert_eq!(grouped.len(), 2);

    let ten = grouped[&HOUR_10_MS];
    assert_eq!(ten.traffic.cars_in, 5);
    assert_eq!(ten.traffic.cars_out, 1);
    assert_eq!(ten.scans, 2);

    let eleven = grouped[&HOUR_11_MS];
    assert_eq!(eleven.traffic.cars_in, 1);
    assert_eq!(eleven.traffic.cars_out, 1);
    assert_eq!(eleven.scans, 1);
}

#[tokio::test]
async fn batch_creates_one_bucket_per_hour() {
    let (_dir, scanners, traffic, ingestor, _events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000001", "Warsaw", "S8").await;

    let scans = vec![
        common::scan(HOUR_10 + 900, 3, 1),
        common::scan(HOUR_10 + 2700, 2, 0),
        common::scan(HOUR_11 + 300, 1, 1),
    ];
    let processed = ingestor.save_scans(&scanner, &scans).await.unwrap();
    assert_eq!(processed, 3);

    let buckets = traffic
        .buckets_in_range(HOUR_10_MS, HOUR_11_MS + 1)
        .await
        .unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].hour_timestamp, HOUR_10_MS);
    assert_eq!(buckets[0].traffic.cars_in, 5);
    assert_eq!(buckets[0].traffic.cars_out, 1);
    assert_eq!(buckets[1].hour_timestamp, HOUR_11_MS);
    assert_eq!(buckets[1].traffic.cars_in, 1);
    assert_eq!(buckets[1].traffic.cars_out, 1);
}

#[tokio::test]
async fn second_batch_merges_into_latest_bucket() {
    let (_dir, scanners, traffic, ingestor, _events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000002", "Warsaw", "A2").await;

    ingestor
        .save_scans(&scanner, &[common::scan(HOUR_10 + 60, 4, 2)])
        .await
        .unwrap();
    let processed = ingestor
        .save_scans(&scanner, &[common::scan(HOUR_10 + 120, 1, 1)])
        .await
        .unwrap();
    assert_eq!(processed, 1);

    // Still a single row for the hour, with summed counters.
    let buckets = traffic
        .buckets_in_range(HOUR_10_MS, HOUR_11_MS)
        .await
        .unwrap();
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].traffic.cars_in, 5);
    assert_eq!(buckets[0].traffic.cars_out, 3);
}

#[tokio::test]
async fn earlier_hour_than_latest_bucket_inserts_new_row() {
    let (_dir, scanners, traffic, ingestor, _events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000003", "Warsaw", "A1").await;

    ingestor
        .save_scans(&scanner, &[common::scan(HOUR_11 + 60, 1, 0)])
        .await
        .unwrap();
    // Late-arriving batch for the previous hour: no merge, new row.
    ingestor
        .save_scans(&scanner, &[common::scan(HOUR_10 + 60, 2, 2)])
        .await
        .unwrap();

    let buckets = traffic
        .buckets_in_range(HOUR_10_MS, HOUR_11_MS + 1)
        .await
        .unwrap();
    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].hour_timestamp, HOUR_10_MS);
    assert_eq!(buckets[0].traffic.cars_in, 2);
}

#[tokio::test]
async fn inactive_scanner_ingests_nothing() {
    let (_dir, scanners, traffic, ingestor, _events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000004", "Warsaw", "S2").await;
    scanners
        .update_status(scanner.id, ScannerStatus::Inactive)
        .await
        .unwrap();
    let scanner = scanners.fetch(scanner.id).await.unwrap().unwrap();

    let processed = ingestor
        .save_scans(&scanner, &[common::scan(HOUR_10 + 60, 9, 9)])
        .await
        .unwrap();
    assert_eq!(processed, 0);

    let buckets = traffic.buckets_in_range(0, i64::MAX).await.unwrap();
    assert!(buckets.is_empty());
}

#[tokio::test]
async fn out_of_order_scanner_recovers_on_valid_batch() {
    let (_dir, scanners, _traffic, ingestor, events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000005", "Gdansk", "S6").await;
    scanners
        .update_status(scanner.id, ScannerStatus::OutOfOrder)
        .await
        .unwrap();
    let scanner = scanners.fetch(scanner.id).await.unwrap().unwrap();
    assert_eq!(scanner.status, ScannerStatus::OutOfOrder);

    let mut rx = events.subscribe();
    ingestor
        .save_scans(&scanner, &[common::scan(HOUR_10 + 60, 1, 0)])
        .await
        .unwrap();

    let stored = scanners.fetch(scanner.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScannerStatus::Active);

    let DataChange::Scanner(published) = rx.try_recv().unwrap();
    assert_eq!(published.id, scanner.id);
    assert_eq!(published.status, ScannerStatus::Active);
}

#[tokio::test]
async fn empty_batch_rejected_before_any_write() {
    let (_dir, scanners, traffic, ingestor, _events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000006", "Lodz", "A1").await;

    let err = ingestor.save_scans(&scanner, &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert!(traffic.buckets_in_range(0, i64::MAX).await.unwrap().is_empty());
}

#[tokio::test]
async fn negative_counters_reject_the_whole_batch() {
    let (_dir, scanners, traffic, ingestor, _events) = setup().await;
    let scanner = common::insert_scanner(&scanners, "860000000000007", "Lodz", "A2").await;

    let scans = vec![common::scan(HOUR_10 + 60, 3, 0), common::scan(HOUR_10 + 120, -1, 0)];
    let err = ingestor.save_scans(&scanner, &scans).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    // The valid scan in the batch must not have been persisted either.
    assert!(traffic.buckets_in_range(0, i64::MAX).await.unwrap().is_empty());
}
