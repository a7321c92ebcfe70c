// Status monitor tests: deadline demotion, last-seen fallback, skip rules

mod common;

use trafficwatch::db::now_ms;
use trafficwatch::models::ScannerStatus;
use trafficwatch::scanner_repo::ScannerRepo;
use trafficwatch::status_monitor::{check_statuses, should_go_out_of_order};
use trafficwatch::traffic_repo::TrafficRepo;

const HOUR_MS: i64 = 3_600_000;

#[test]
fn only_active_scanners_are_eligible_for_demotion() {
    let mut scanner = trafficwatch::models::Scanner {
        id: 1,
        name: "s".into(),
        imei: "860000000000001".into(),
        city: "Warsaw".into(),
        road: "S8".into(),
        coordinates: "Unknown".into(),
        status: ScannerStatus::Active,
        created_at: 0,
        updated_at: 0,
    };
    // Silent well past the deadline.
    assert!(should_go_out_of_order(&scanner, Some(100), 1000));

    scanner.status = ScannerStatus::OutOfOrder;
    assert!(!should_go_out_of_order(&scanner, Some(100), 1000));

    scanner.status = ScannerStatus::Inactive;
    assert!(!should_go_out_of_order(&scanner, Some(100), 1000));
}

#[test]
fn creation_time_is_the_liveness_reference_without_traffic() {
    let scanner = trafficwatch::models::Scanner {
        id: 1,
        name: "s".into(),
        imei: "860000000000001".into(),
        city: "Warsaw".into(),
        road: "S8".into(),
        coordinates: "Unknown".into(),
        status: ScannerStatus::Active,
        created_at: 500,
        updated_at: 500,
    };
    assert!(should_go_out_of_order(&scanner, None, 1000));
    assert!(!should_go_out_of_order(&scanner, None, 400));
}

#[tokio::test]
async fn silent_scanner_is_demoted_and_fresh_one_kept() {
    let (_dir, pool) = common::test_pool().await;
    let scanners = ScannerRepo::new(pool.clone());
    let traffic = TrafficRepo::new(pool.clone());

    let stale = common::insert_scanner(&scanners, "860000000000011", "Warsaw", "S8").await;
    let fresh = common::insert_scanner(&scanners, "860000000000012", "Warsaw", "A2").await;

    common::insert_bucket(&traffic, &stale.imei, now_ms() - 5 * HOUR_MS, 1, 1).await;
    common::backdate_buckets(&pool, &stale.imei, now_ms() - 5 * HOUR_MS).await;
    common::insert_bucket(&traffic, &fresh.imei, now_ms() - HOUR_MS, 1, 1).await;

    let outcome = check_statuses(&scanners, &traffic, 2).await.unwrap();
    assert_eq!(outcome.scanners_checked, 2);
    assert_eq!(outcome.scanners_out_of_order, 1);

    let stale = scanners.fetch(stale.id).await.unwrap().unwrap();
    assert_eq!(stale.status, ScannerStatus::OutOfOrder);
    let fresh = scanners.fetch(fresh.id).await.unwrap().unwrap();
    assert_eq!(fresh.status, ScannerStatus::Active);
}

#[tokio::test]
async fn scanner_without_traffic_falls_back_to_creation_time() {
    let (_dir, pool) = common::test_pool().await;
    let scanners = ScannerRepo::new(pool.clone());
    let traffic = TrafficRepo::new(pool.clone());

    let old = common::insert_scanner(&scanners, "860000000000021", "Gdansk", "S6").await;
    common::backdate_scanner(&pool, old.id, now_ms() - 10 * HOUR_MS).await;
    let new = common::insert_scanner(&scanners, "860000000000022", "Gdansk", "S7").await;

    let outcome = check_statuses(&scanners, &traffic, 2).await.unwrap();
    assert_eq!(outcome.scanners_out_of_order, 1);

    let old = scanners.fetch(old.id).await.unwrap().unwrap();
    assert_eq!(old.status, ScannerStatus::OutOfOrder);
    // Just-created scanner gets its grace period.
    let new = scanners.fetch(new.id).await.unwrap().unwrap();
    assert_eq!(new.status, ScannerStatus::Active);
}

#[tokio::test]
async fn inactive_and_out_of_order_scanners_are_never_touched() {
    let (_dir, pool) = common::test_pool().await;
    let scanners = ScannerRepo::new(pool.clone());
    let traffic = TrafficRepo::new(pool.clone());

    let inactive = common::insert_scanner(&scanners, "860000000000031", "Lodz", "A1").await;
    scanners
        .update_status(inactive.id, ScannerStatus::Inactive)
        .await
        .unwrap();
    common::backdate_scanner(&pool, inactive.id, now_ms() - 10 * HOUR_MS).await;

    let broken = common::insert_scanner(&scanners, "860000000000032", "Lodz", "A2").await;
    scanners
        .update_status(broken.id, ScannerStatus::OutOfOrder)
        .await
        .unwrap();
    common::backdate_scanner(&pool, broken.id, now_ms() - 10 * HOUR_MS).await;

    let outcome = check_statuses(&scanners, &traffic, 2).await.unwrap();
    assert_eq!(outcome.scanners_checked, 2);
    assert_eq!(outcome.scanners_out_of_order, 0);

    let inactive = scanners.fetch(inactive.id).await.unwrap().unwrap();
    assert_eq!(inactive.status, ScannerStatus::Inactive);
    let broken = scanners.fetch(broken.id).await.unwrap().unwrap();
    assert_eq!(broken.status, ScannerStatus::OutOfOrder);
}
