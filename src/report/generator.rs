// Pure per-scanner report aggregation over one window of buckets.

use chrono::{DateTime, Datelike, Utc, Weekday};

use crate::models::{
    Direction, DuringWeekTotals, HotHour, NewTrafficReport, Scanner, TrafficBucket, TrafficCount,
    WeekdayTotals,
};

pub const TOP_HOT_HOURS: usize = 5;

/// Assembles one scanner's report from its buckets in the window.
pub fn build_report(
    scanner: &Scanner,
    buckets: &[TrafficBucket],
    report_date_ms: i64,
) -> NewTrafficReport {
    NewTrafficReport {
        scanner_id: scanner.id,
        city: scanner.city.clone(),
        road: scanner.road.clone(),
        date: report_date_ms,
        total_per_week: TrafficCount {
            cars_in: buckets.iter().map(|b| b.traffic.cars_in).sum(),
            cars_out: buckets.iter().map(|b| b.traffic.cars_out).sum(),
        },
        total_during_week: DuringWeekTotals {
            cars_in: weekday_totals(buckets, Direction::In),
            cars_out: weekday_totals(buckets, Direction::Out),
        },
        top_five_hot_hours: top_hot_hours(buckets, TOP_HOT_HOURS),
    }
}

/// One direction's traffic summed per UTC weekday of the bucket hour.
pub fn weekday_totals(buckets: &[TrafficBucket], direction: Direction) -> WeekdayTotals {
    let mut totals = WeekdayTotals::default();
    for bucket in buckets {
        let Some(weekday) = weekday_of_ms(bucket.hour_timestamp) else {
            continue;
        };
        totals.add(weekday, bucket.traffic.get(direction));
    }
    totals
}

fn weekday_of_ms(timestamp_ms: i64) -> Option<Weekday> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms).map(|dt| dt.weekday())
}

/// Top hours across both directions: each direction independently nominates
/// its `top_size` highest buckets, then the winners are the `top_size`
/// highest of those candidates. Candidates are unique per (hour, direction)
/// by construction, so the result never repeats a pair; an hour can appear
/// twice only when it is top-ranked for both directions. Ties keep
/// first-encountered order (stable sort), with `in` nominated before `out`.
pub fn top_hot_hours(buckets: &[TrafficBucket], top_size: usize) -> Vec<HotHour> {
    let mut candidates: Vec<HotHour> = Vec::with_capacity(top_size * 2);
    for direction in [Direction::In, Direction::Out] {
        candidates.extend(top_by_direction(buckets, direction, top_size));
    }
    candidates.sort_by(|a, b| b.cars_amount.cmp(&a.cars_amount));
    candidates.truncate(top_size);

    debug_assert!(
        {
            let mut pairs: Vec<(i64, Direction)> = candidates
                .iter()
                .map(|h| (h.timestamp, h.direction))
                .collect();
            pairs.sort();
            pairs.windows(2).all(|w| w[0] != w[1])
        },
        "duplicate (hour, direction) pair in hot hours"
    );
    candidates
}

fn top_by_direction(buckets: &[TrafficBucket], direction: Direction, count: usize) -> Vec<HotHour> {
    let mut ranked: Vec<&TrafficBucket> = buckets.iter().collect();
    ranked.sort_by(|a, b| b.traffic.get(direction).cmp(&a.traffic.get(direction)));
    ranked.truncate(count);
    ranked
        .into_iter()
        .map(|bucket| HotHour {
            timestamp: bucket.hour_timestamp,
            direction,
            cars_amount: bucket.traffic.get(direction),
        })
        .collect()
}
