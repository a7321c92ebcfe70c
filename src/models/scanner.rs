use serde::{Deserialize, Serialize};

/// Sentinel coordinate value for scanners whose position is not known yet.
/// Such scanners are always excluded from proximity filtering.
pub const UNKNOWN_COORDINATES: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScannerStatus {
    /// Reporting traffic (or expected to).
    Active,
    /// Administratively suppressed: ingestion is a no-op, never auto-entered or auto-exited.
    Inactive,
    /// Silent past the inactivity deadline; flips back to active on the next valid batch.
    OutOfOrder,
}

impl ScannerStatus {
    pub const DEFAULT: ScannerStatus = ScannerStatus::Active;

    pub fn as_str(self) -> &'static str {
        match self {
            ScannerStatus::Active => "active",
            ScannerStatus::Inactive => "inactive",
            ScannerStatus::OutOfOrder => "out_of_order",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ScannerStatus::Active),
            "inactive" => Some(ScannerStatus::Inactive),
            "out_of_order" => Some(ScannerStatus::OutOfOrder),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScannerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full scanner row. Unique per (city, road); imei joins traffic buckets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scanner {
    pub id: i64,
    pub name: String,
    pub imei: String,
    pub city: String,
    pub road: String,
    pub coordinates: String,
    pub status: ScannerStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields the administrative create accepts.
#[derive(Debug, Clone)]
pub struct NewScanner {
    pub name: String,
    pub imei: String,
    pub city: String,
    pub road: String,
    pub coordinates: String,
    pub status: ScannerStatus,
}

/// Listing projection for GET /api/scanners.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerListItem {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub road: String,
    pub coordinates: String,
    pub status: ScannerStatus,
}

/// Basic projection for proximity queries. The imei drives the lastSeen
/// enrichment but is stripped from the response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerBasic {
    pub id: i64,
    #[serde(skip_serializing)]
    pub imei: String,
    pub coordinates: String,
    pub status: ScannerStatus,
    pub last_seen: Option<i64>,
}
