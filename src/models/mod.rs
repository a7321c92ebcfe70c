// Domain models (scanner fleet, hourly traffic buckets, weekly reports)

mod report;
mod scanner;
mod traffic;

pub use report::{
    DuringWeekTotals, HotHour, NewTrafficReport, ReportDetail, ReportListItem, ReportScannerRef,
    TrafficReport, WeekdayTotals,
};
pub use scanner::{
    NewScanner, Scanner, ScannerBasic, ScannerListItem, ScannerStatus, UNKNOWN_COORDINATES,
};
pub use traffic::{Direction, NewBucket, RawScan, TrafficBucket, TrafficCount};
