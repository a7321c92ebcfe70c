use serde::{Deserialize, Serialize};

/// In/out vehicle counters. Used both for raw scan payloads and bucket totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficCount {
    #[serde(rename = "in")]
    pub cars_in: i64,
    #[serde(rename = "out")]
    pub cars_out: i64,
}

impl TrafficCount {
    pub fn get(self, direction: Direction) -> i64 {
        match direction {
            Direction::In => self.cars_in,
            Direction::Out => self.cars_out,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

/// One raw scan record from a device batch. Timestamp is unix seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScan {
    pub timestamp: i64,
    pub traffic: TrafficCount,
}

/// Persisted per-scanner, per-hour aggregate. hour_timestamp is the
/// epoch-ms start of the hour. Unique per (imei, hour_timestamp).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficBucket {
    pub id: i64,
    pub imei: String,
    pub hour_timestamp: i64,
    pub traffic: TrafficCount,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBucket {
    pub imei: String,
    pub hour_timestamp: i64,
    pub traffic: TrafficCount,
}
