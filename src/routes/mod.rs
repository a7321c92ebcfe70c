// HTTP routes

mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::events::DataChange;
use crate::ingest::Ingestor;
use crate::models::{ReportDetail, Scanner};
use crate::report_repo::ReportRepo;
use crate::scanner_repo::ScannerRepo;
use crate::traffic_repo::TrafficRepo;

#[derive(Clone)]
pub struct AppState {
    pub(crate) scanners: Arc<ScannerRepo>,
    pub(crate) traffic: Arc<TrafficRepo>,
    pub(crate) reports: Arc<ReportRepo>,
    pub(crate) ingestor: Arc<Ingestor>,
    pub(crate) scanner_cache: TtlCache<Scanner>,
    pub(crate) report_cache: TtlCache<ReportDetail>,
    pub(crate) events: broadcast::Sender<DataChange>,
    pub(crate) config: AppConfig,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scanners: Arc<ScannerRepo>,
        traffic: Arc<TrafficRepo>,
        reports: Arc<ReportRepo>,
        ingestor: Arc<Ingestor>,
        scanner_cache: TtlCache<Scanner>,
        report_cache: TtlCache<ReportDetail>,
        events: broadcast::Sender<DataChange>,
        config: AppConfig,
    ) -> Self {
        Self {
            scanners,
            traffic,
            reports,
            ingestor,
            scanner_cache,
            report_cache,
            events,
            config,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "trafficwatch" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/traffic_scan", post(http::traffic_scan)) // POST /api/traffic_scan
        .route(
            "/api/scanners",
            get(http::list_scanners).post(http::add_scanner),
        )
        .route("/api/scanners/basic", get(http::list_scanners_basic))
        .route(
            "/api/scanners/{id}",
            get(http::fetch_scanner).patch(http::edit_scanner),
        )
        .route("/api/traffic_report", get(http::list_reports))
        .route("/api/traffic_report/{id}", get(http::fetch_report))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
