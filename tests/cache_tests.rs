// TTL cache and cache-refresher tests

use std::time::Duration;
use trafficwatch::cache::TtlCache;
use trafficwatch::events::{self, DataChange, spawn_cache_refresher};
use trafficwatch::models::{Scanner, ScannerStatus};

fn scanner(id: i64, name: &str) -> Scanner {
    Scanner {
        id,
        name: name.into(),
        imei: "860000000000001".into(),
        city: "Warsaw".into(),
        road: "S8".into(),
        coordinates: "Unknown".into(),
        status: ScannerStatus::Active,
        created_at: 0,
        updated_at: 0,
    }
}

#[tokio::test]
async fn miss_then_hit() {
    let cache: TtlCache<Scanner> = TtlCache::new(16, Duration::from_secs(60));
    assert!(cache.get(1).await.is_none());

    cache.insert(1, scanner(1, "a")).await;
    assert_eq!(cache.get(1).await.unwrap().name, "a");
    assert!(cache.get(2).await.is_none());
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let cache: TtlCache<Scanner> = TtlCache::new(16, Duration::from_millis(100));
    cache.insert(1, scanner(1, "a")).await;
    assert!(cache.get(1).await.is_some());

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(cache.get(1).await.is_none());
}

#[tokio::test]
async fn insert_overwrites_existing_entry() {
    let cache: TtlCache<Scanner> = TtlCache::new(16, Duration::from_secs(60));
    cache.insert(1, scanner(1, "old")).await;
    cache.insert(1, scanner(1, "new")).await;
    assert_eq!(cache.get(1).await.unwrap().name, "new");
}

#[tokio::test]
async fn invalidate_removes_entry() {
    let cache: TtlCache<Scanner> = TtlCache::new(16, Duration::from_secs(60));
    cache.insert(1, scanner(1, "a")).await;
    cache.invalidate(1).await;
    assert!(cache.get(1).await.is_none());
}

#[tokio::test]
async fn refresher_overwrites_stale_cached_scanner() {
    let cache: TtlCache<Scanner> = TtlCache::new(16, Duration::from_secs(60));
    let tx = events::channel(8);
    let _task = spawn_cache_refresher(tx.subscribe(), cache.clone());

    cache.insert(1, scanner(1, "stale")).await;
    tx.send(DataChange::Scanner(scanner(1, "fresh"))).unwrap();

    // The refresher task needs a moment to consume the event.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if cache.get(1).await.map(|s| s.name) == Some("fresh".into()) {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "cache was never refreshed"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
