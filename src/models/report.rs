use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::{Direction, TrafficCount};

/// One direction's traffic summed per UTC weekday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayTotals {
    pub monday: i64,
    pub tuesday: i64,
    pub wednesday: i64,
    pub thursday: i64,
    pub friday: i64,
    pub saturday: i64,
    pub sunday: i64,
}

impl WeekdayTotals {
    pub fn add(&mut self, weekday: Weekday, amount: i64) {
        match weekday {
            Weekday::Mon => self.monday += amount,
            Weekday::Tue => self.tuesday += amount,
            Weekday::Wed => self.wednesday += amount,
            Weekday::Thu => self.thursday += amount,
            Weekday::Fri => self.friday += amount,
            Weekday::Sat => self.saturday += amount,
            Weekday::Sun => self.sunday += amount,
        }
    }

    pub fn sum(&self) -> i64 {
        self.monday
            + self.tuesday
            + self.wednesday
            + self.thursday
            + self.friday
            + self.saturday
            + self.sunday
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuringWeekTotals {
    #[serde(rename = "in")]
    pub cars_in: WeekdayTotals,
    #[serde(rename = "out")]
    pub cars_out: WeekdayTotals,
}

/// One of the top single-direction hours of a report window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotHour {
    pub timestamp: i64,
    pub direction: Direction,
    pub cars_amount: i64,
}

/// Persisted weekly report row. Immutable after creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficReport {
    pub id: i64,
    pub scanner_id: i64,
    pub city: String,
    pub road: String,
    /// Window end (epoch ms); the window is [date - 7d, date).
    pub date: i64,
    pub total_per_week: TrafficCount,
    pub total_during_week: DuringWeekTotals,
    pub top_five_hot_hours: Vec<HotHour>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrafficReport {
    pub scanner_id: i64,
    pub city: String,
    pub road: String,
    pub date: i64,
    pub total_per_week: TrafficCount,
    pub total_during_week: DuringWeekTotals,
    pub top_five_hot_hours: Vec<HotHour>,
}

/// Listing projection for GET /api/traffic_report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListItem {
    pub id: i64,
    pub road: String,
    pub date: i64,
    pub total_per_week: TrafficCount,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportScannerRef {
    pub id: i64,
    pub imei: String,
    pub coordinates: String,
}

/// Detail projection for GET /api/traffic_report/{id}: city and raw
/// timestamps stripped, owning scanner embedded. This is what gets cached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetail {
    pub id: i64,
    pub road: String,
    pub date: i64,
    pub total_per_week: TrafficCount,
    pub total_during_week: DuringWeekTotals,
    pub top_five_hot_hours: Vec<HotHour>,
    pub scanner: ReportScannerRef,
}
