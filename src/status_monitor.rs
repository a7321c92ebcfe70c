// Scheduled liveness check: demote active scanners silent past the deadline.

use serde::Serialize;
use std::collections::HashMap;

use crate::db::now_ms;
use crate::models::{Scanner, ScannerStatus};
use crate::scanner_repo::ScannerRepo;
use crate::traffic_repo::TrafficRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheckOutcome {
    pub scanners_checked: usize,
    pub scanners_out_of_order: usize,
}

/// Whether a scanner should be demoted. out_of_order scanners are already
/// demoted; inactive is administrative and never evaluated. Without any
/// traffic the scanner's own creation time is the liveness reference.
pub fn should_go_out_of_order(scanner: &Scanner, last_seen: Option<i64>, deadline_ms: i64) -> bool {
    if scanner.status != ScannerStatus::Active {
        return false;
    }
    last_seen.unwrap_or(scanner.created_at) < deadline_ms
}

/// One monitor run over the whole fleet. Last-seen times come from a single
/// grouped query; all demotion writes are issued and awaited together.
pub async fn check_statuses(
    scanners: &ScannerRepo,
    traffic: &TrafficRepo,
    inactivity_deadline_hours: u32,
) -> anyhow::Result<StatusCheckOutcome> {
    let all = scanners.all().await?;
    let imeis: Vec<&str> = all.iter().map(|s| s.imei.as_str()).collect();
    let last_seen: HashMap<String, i64> = traffic.last_seen_by_imei(&imeis).await?;

    let deadline_ms = now_ms() - (inactivity_deadline_hours as i64) * 3_600_000;

    let mut writes = Vec::new();
    for scanner in &all {
        if should_go_out_of_order(scanner, last_seen.get(&scanner.imei).copied(), deadline_ms) {
            tracing::debug!(imei = %scanner.imei, "scanner silent past deadline, marking out_of_order");
            writes.push(scanners.update_status(scanner.id, ScannerStatus::OutOfOrder));
        }
    }
    let scanners_out_of_order = writes.len();
    futures_util::future::try_join_all(writes).await?;

    Ok(StatusCheckOutcome {
        scanners_checked: all.len(),
        scanners_out_of_order,
    })
}
