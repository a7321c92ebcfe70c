// Request handlers: ingestion, scanner administration, report lookups.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::error::ApiError;
use crate::events::DataChange;
use crate::geo;
use crate::models::{
    NewScanner, RawScan, ReportDetail, ReportScannerRef, Scanner, ScannerStatus,
    UNKNOWN_COORDINATES,
};
use crate::version::{NAME, VERSION};

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

#[derive(Deserialize)]
pub(super) struct TrafficScanBody {
    imei: String,
    scans: Vec<RawScan>,
}

/// POST /api/traffic_scan — device batch ingestion. The scanner is looked up
/// by imei first; an unknown device is rejected before any write.
pub(super) async fn traffic_scan(
    State(state): State<AppState>,
    Json(body): Json<TrafficScanBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let imei = non_empty(&body.imei, "IMEI must be a non-empty string")?;
    let scanner = state
        .scanners
        .fetch_by_imei(&imei)
        .await?
        .ok_or_else(|| ApiError::NotFound("Scanner".into()))?;

    let scans = state.ingestor.save_scans(&scanner, &body.scans).await?;
    Ok(Json(json!({ "scans": scans })))
}

#[derive(Deserialize)]
pub(super) struct AddScannerBody {
    name: String,
    imei: String,
    city: String,
    road: String,
    coordinates: String,
    status: Option<ScannerStatus>,
}

/// POST /api/scanners — one scanner per (city, road); duplicates conflict.
pub(super) async fn add_scanner(
    State(state): State<AppState>,
    Json(body): Json<AddScannerBody>,
) -> Result<Json<Scanner>, ApiError> {
    let name = non_empty(&body.name, "Name must be a non-empty string")?;
    let imei = non_empty(&body.imei, "IMEI must be a non-empty string")?;
    let city = non_empty(&body.city, "City must be a non-empty string")?;
    let road = non_empty(&body.road, "Road must be a non-empty string")?.to_uppercase();
    let coordinates = body.coordinates.trim().to_string();
    if coordinates != UNKNOWN_COORDINATES {
        geo::parse_coordinates(&coordinates)?;
    }

    if state.scanners.find_by_city_road(&city, &road).await?.is_some() {
        return Err(ApiError::Duplicate(
            "Scanner already exists with the given city and road.".into(),
        ));
    }

    let scanner = state
        .scanners
        .create(&NewScanner {
            name,
            imei,
            city,
            road,
            coordinates,
            status: body.status.unwrap_or(ScannerStatus::DEFAULT),
        })
        .await?;
    Ok(Json(scanner))
}

#[derive(Deserialize)]
pub(super) struct EditScannerBody {
    name: Option<String>,
    imei: Option<String>,
}

/// PATCH /api/scanners/{id} — only name and imei are editable (hardware
/// replacement); city and road are fixed. Publishes a data-change event
/// when something actually changed.
pub(super) async fn edit_scanner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EditScannerBody>,
) -> Result<Json<Scanner>, ApiError> {
    let scanner = state
        .scanners
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scanner({id})")))?;

    let name = match &body.name {
        Some(name) => non_empty(name, "Name must be a non-empty string")?,
        None => scanner.name.clone(),
    };
    let imei = match &body.imei {
        Some(imei) => non_empty(imei, "IMEI must be a non-empty string")?,
        None => scanner.imei.clone(),
    };

    let changed = name != scanner.name || imei != scanner.imei;
    if changed {
        state.scanners.update_details(id, &name, &imei).await?;
    }

    let updated = state
        .scanners
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scanner({id})")))?;
    if changed {
        let _ = state.events.send(DataChange::Scanner(updated.clone()));
    }
    Ok(Json(updated))
}

/// GET /api/scanners/{id} — read-through cached fetch.
pub(super) async fn fetch_scanner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Scanner>, ApiError> {
    if let Some(cached) = state.scanner_cache.get(id).await {
        return Ok(Json(cached));
    }
    let scanner = state
        .scanners
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scanner({id})")))?;
    state.scanner_cache.insert(id, scanner.clone()).await;
    Ok(Json(scanner))
}

#[derive(Deserialize)]
pub(super) struct ScannerListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    city: Option<String>,
    road: Option<String>,
}

/// GET /api/scanners — paginated listing with optional city/road filters.
pub(super) async fn list_scanners(
    State(state): State<AppState>,
    Query(query): Query<ScannerListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = check_limit(query.limit)?;
    let offset = check_offset(query.offset)?;
    let road = query.road.map(|r| r.to_uppercase());

    let (scanners, count) = state
        .scanners
        .list(limit, offset, query.city.as_deref(), road.as_deref())
        .await?;
    Ok(Json(json!({ "scanners": scanners, "count": count })))
}

#[derive(Deserialize)]
pub(super) struct BasicListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    coordinates: Option<String>,
    radius: Option<f64>,
}

/// GET /api/scanners/basic — paginated basic projection with optional
/// proximity filter. Filtering happens strictly within the fetched page;
/// scanners with unknown coordinates never match. Each result carries
/// lastSeen, the latest bucket write time for its imei.
pub(super) async fn list_scanners_basic(
    State(state): State<AppState>,
    Query(query): Query<BasicListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = check_limit(query.limit)?;
    let offset = check_offset(query.offset)?;

    let filter = match (&query.coordinates, query.radius) {
        (Some(coordinates), Some(radius)) => {
            if radius <= 0.0 || !radius.is_finite() {
                return Err(ApiError::Validation(
                    "radius must be a positive number of meters".into(),
                ));
            }
            Some((geo::parse_coordinates(coordinates)?, radius))
        }
        (None, None) => None,
        _ => {
            return Err(ApiError::Validation(
                "coordinates and radius must be provided together".into(),
            ));
        }
    };

    let mut scanners = state.scanners.list_basic(limit, offset).await?;

    if let Some((center, radius)) = filter {
        let earth_radius_km = state.config.geo.earth_radius_km;
        scanners.retain(|scanner| {
            if scanner.coordinates == UNKNOWN_COORDINATES {
                return false;
            }
            match geo::parse_coordinates(&scanner.coordinates) {
                Ok(point) => geo::within_radius(point, center, radius, earth_radius_km),
                Err(_) => false,
            }
        });
    }

    if !scanners.is_empty() {
        let imeis: Vec<&str> = scanners.iter().map(|s| s.imei.as_str()).collect();
        let last_seen = state.traffic.last_seen_by_imei(&imeis).await?;
        for scanner in &mut scanners {
            scanner.last_seen = last_seen.get(&scanner.imei).copied();
        }
    }

    let count = scanners.len();
    Ok(Json(json!({ "scanners": scanners, "count": count })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReportListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    road: Option<String>,
    date: Option<i64>,
    traffic_number: Option<i64>,
}

/// GET /api/traffic_report — paginated listing with optional filters.
pub(super) async fn list_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = check_limit(query.limit)?;
    let offset = check_offset(query.offset)?;
    let road = query.road.map(|r| r.to_uppercase());

    let (items, count) = state
        .reports
        .list(limit, offset, road.as_deref(), query.date, query.traffic_number)
        .await?;
    Ok(Json(json!({ "trafficReport": items, "count": count })))
}

/// GET /api/traffic_report/{id} — read-through cached detail with the
/// owning scanner embedded.
pub(super) async fn fetch_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ReportDetail>, ApiError> {
    if let Some(cached) = state.report_cache.get(id).await {
        return Ok(Json(cached));
    }

    let report = state
        .reports
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Traffic report ({id})")))?;
    let scanner = state
        .scanners
        .fetch(report.scanner_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scanner({})", report.scanner_id)))?;

    let detail = ReportDetail {
        id: report.id,
        road: report.road,
        date: report.date,
        total_per_week: report.total_per_week,
        total_during_week: report.total_during_week,
        top_five_hot_hours: report.top_five_hot_hours,
        scanner: ReportScannerRef {
            id: scanner.id,
            imei: scanner.imei,
            coordinates: scanner.coordinates,
        },
    };
    state.report_cache.insert(id, detail.clone()).await;
    Ok(Json(detail))
}

fn non_empty(value: &str, message: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(message.into()));
    }
    Ok(trimmed.to_string())
}

fn check_limit(limit: Option<i64>) -> Result<i64, ApiError> {
    let limit = limit.unwrap_or(100);
    if !(1..=1000).contains(&limit) {
        return Err(ApiError::Validation(
            "Limit must be a number between 1 and 1000".into(),
        ));
    }
    Ok(limit)
}

fn check_offset(offset: Option<i64>) -> Result<i64, ApiError> {
    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::Validation(
            "offset must be a positive integer".into(),
        ));
    }
    Ok(offset)
}
