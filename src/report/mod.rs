// Weekly report job: window selection and persistence.
// Pure per-scanner aggregation (weekday rollups, hot hours) lives in generator.

pub mod generator;

use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::db::now_ms;
use crate::models::TrafficBucket;
use crate::report_repo::ReportRepo;
use crate::scanner_repo::ScannerRepo;
use crate::traffic_repo::TrafficRepo;

pub const REPORT_WINDOW_MS: i64 = 7 * 24 * 3_600_000;

/// One generation run: advances exactly one 7-day window from the last
/// report's date (or now - 7d when none exists). No backfill for missed
/// runs. Returns the number of reports written.
pub async fn generate_reports(
    scanners: &ScannerRepo,
    traffic: &TrafficRepo,
    reports: &ReportRepo,
) -> anyhow::Result<usize> {
    let date_from = match reports.latest().await? {
        Some(last) => last.date,
        None => now_ms() - REPORT_WINDOW_MS,
    };
    let date_to = date_from + REPORT_WINDOW_MS;

    let buckets = traffic.buckets_in_range(date_from, date_to).await?;
    if buckets.is_empty() {
        info!(date_from, date_to, "no scanner traffic in report window");
        return Ok(0);
    }

    let by_imei = group_by_imei(buckets);
    let imeis: Vec<&str> = by_imei.keys().map(String::as_str).collect();
    let involved = scanners.fetch_by_imeis(&imeis).await?;

    let mut prepared = Vec::with_capacity(by_imei.len());
    for (imei, scanner_buckets) in &by_imei {
        match involved.iter().find(|s| s.imei == *imei) {
            Some(scanner) => {
                prepared.push(generator::build_report(scanner, scanner_buckets, date_to));
            }
            None => warn!(imei = %imei, "traffic without a matching scanner, skipping"),
        }
    }

    reports.insert_reports(&prepared).await?;
    Ok(prepared.len())
}

fn group_by_imei(buckets: Vec<TrafficBucket>) -> BTreeMap<String, Vec<TrafficBucket>> {
    let mut by_imei: BTreeMap<String, Vec<TrafficBucket>> = BTreeMap::new();
    for bucket in buckets {
        by_imei.entry(bucket.imei.clone()).or_default().push(bucket);
    }
    by_imei
}
