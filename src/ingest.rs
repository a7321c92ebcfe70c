// Scan ingestor: hour bucketing, merge with the latest stored bucket,
// liveness-driven status recovery.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::error::ApiError;
use crate::events::DataChange;
use crate::models::{NewBucket, RawScan, Scanner, ScannerStatus, TrafficCount};
use crate::scanner_repo::ScannerRepo;
use crate::traffic_repo::TrafficRepo;

/// Per-hour accumulator for one batch. The scan counter feeds the
/// processed-count the device gets back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketAccum {
    pub traffic: TrafficCount,
    pub scans: u64,
}

pub struct Ingestor {
    scanners: Arc<ScannerRepo>,
    traffic: Arc<TrafficRepo>,
    events: broadcast::Sender<DataChange>,
}

impl Ingestor {
    pub fn new(
        scanners: Arc<ScannerRepo>,
        traffic: Arc<TrafficRepo>,
        events: broadcast::Sender<DataChange>,
    ) -> Self {
        Self {
            scanners,
            traffic,
            events,
        }
    }

    /// Persists one raw scan batch for a scanner. Returns the number of raw
    /// scan records processed (merged + newly inserted).
    #[instrument(skip(self, scanner, scans), fields(imei = %scanner.imei, scans_count = scans.len()))]
    pub async fn save_scans(&self, scanner: &Scanner, scans: &[RawScan]) -> Result<u64, ApiError> {
        validate_scans(scans)?;

        // Administrative suppression short-circuits ingestion entirely.
        if scanner.status == ScannerStatus::Inactive {
            return Ok(0);
        }

        let mut grouped = group_scans_by_hour(scans);
        let mut processed: u64 = 0;

        // If the batch's earliest hour matches the most recently stored
        // bucket, add onto that row instead of inserting a duplicate hour.
        if let Some(last) = self.traffic.latest_bucket(&scanner.imei).await? {
            let earliest = grouped.first_key_value().map(|(hour, accum)| (*hour, *accum));
            if let Some((hour, accum)) = earliest
                && hour == last.hour_timestamp
            {
                self.traffic.add_to_bucket(last.id, accum.traffic).await?;
                processed += accum.scans;
                grouped.remove(&hour);
            }
        }

        let mut new_buckets = Vec::with_capacity(grouped.len());
        for (hour_timestamp, accum) in &grouped {
            processed += accum.scans;
            new_buckets.push(NewBucket {
                imei: scanner.imei.clone(),
                hour_timestamp: *hour_timestamp,
                traffic: accum.traffic,
            });
        }
        self.traffic.insert_buckets(&new_buckets).await?;

        // A valid batch is proof of liveness.
        if scanner.status == ScannerStatus::OutOfOrder {
            self.scanners
                .update_status(scanner.id, ScannerStatus::Active)
                .await?;
            tracing::info!(imei = %scanner.imei, "scanner back to active after traffic");
            let mut recovered = scanner.clone();
            recovered.status = ScannerStatus::Active;
            let _ = self.events.send(DataChange::Scanner(recovered));
        }

        Ok(processed)
    }
}

/// Epoch-ms start of the hour containing a unix-seconds timestamp.
pub fn hour_floor_ms(timestamp_secs: i64) -> i64 {
    (timestamp_secs - timestamp_secs.rem_euclid(3600)) * 1000
}

/// Folds a batch into per-hour sums plus a scan counter. BTreeMap iteration
/// yields ascending hour order, so the earliest bucket is first_key_value.
pub fn group_scans_by_hour(scans: &[RawScan]) -> BTreeMap<i64, BucketAccum> {
    let mut hours: BTreeMap<i64, BucketAccum> = BTreeMap::new();
    for scan in scans {
        let accum = hours.entry(hour_floor_ms(scan.timestamp)).or_default();
        accum.traffic.cars_in += scan.traffic.cars_in;
        accum.traffic.cars_out += scan.traffic.cars_out;
        accum.scans += 1;
    }
    hours
}

/// Rejects malformed batches before any persistence write.
pub fn validate_scans(scans: &[RawScan]) -> Result<(), ApiError> {
    if scans.is_empty() {
        return Err(ApiError::Validation(
            "scans must be a non-empty array".into(),
        ));
    }
    for scan in scans {
        if scan.timestamp < 0 {
            return Err(ApiError::Validation(
                "Timestamp is invalid or missing".into(),
            ));
        }
        if scan.traffic.cars_in < 0 {
            return Err(ApiError::Validation("Traffic.in is invalid".into()));
        }
        if scan.traffic.cars_out < 0 {
            return Err(ApiError::Validation("Traffic.out is invalid".into()));
        }
    }
    Ok(())
}
