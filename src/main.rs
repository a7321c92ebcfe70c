use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use trafficwatch::*;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let pool = db::connect(
        &app_config.database.path,
        app_config.database.max_pool_size,
    )
    .await?;
    db::init(&pool).await?;

    let scanner_repo = Arc::new(scanner_repo::ScannerRepo::new(pool.clone()));
    let traffic_repo = Arc::new(traffic_repo::TrafficRepo::new(pool.clone()));
    let report_repo = Arc::new(report_repo::ReportRepo::new(pool));

    let events_tx = events::channel(app_config.events.broadcast_capacity);
    let scanner_cache = cache::TtlCache::new(
        app_config.scanner.cache_capacity,
        Duration::from_secs(app_config.scanner.cache_ttl_secs),
    );
    let report_cache = cache::TtlCache::new(
        app_config.report.cache_capacity,
        Duration::from_secs(app_config.report.cache_ttl_secs),
    );
    let _refresher = events::spawn_cache_refresher(events_tx.subscribe(), scanner_cache.clone());

    let ingestor = Arc::new(ingest::Ingestor::new(
        scanner_repo.clone(),
        traffic_repo.clone(),
        events_tx.clone(),
    ));

    let _status_job = jobs::spawn_job("status_check", app_config.jobs.status_check.clone(), {
        let scanners = scanner_repo.clone();
        let traffic = traffic_repo.clone();
        let deadline_hours = app_config.scanner.inactivity_deadline_hours;
        move || {
            let scanners = scanners.clone();
            let traffic = traffic.clone();
            async move {
                let outcome =
                    status_monitor::check_statuses(&scanners, &traffic, deadline_hours).await?;
                tracing::info!(
                    scanners_checked = outcome.scanners_checked,
                    scanners_out_of_order = outcome.scanners_out_of_order,
                    "scanner statuses checked"
                );
                Ok(())
            }
        }
    });

    let _report_job = jobs::spawn_job(
        "traffic_report",
        app_config.jobs.traffic_report.clone(),
        {
            let scanners = scanner_repo.clone();
            let traffic = traffic_repo.clone();
            let reports = report_repo.clone();
            move || {
                let scanners = scanners.clone();
                let traffic = traffic.clone();
                let reports = reports.clone();
                async move {
                    let written = report::generate_reports(&scanners, &traffic, &reports).await?;
                    tracing::info!(reports_written = written, "weekly traffic reports generated");
                    Ok(())
                }
            }
        },
    );

    let app = routes::app(routes::AppState::new(
        scanner_repo,
        traffic_repo,
        report_repo,
        ingestor,
        scanner_cache,
        report_cache,
        events_tx,
        app_config.clone(),
    ));
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    let in_container = std::path::Path::new("/.dockerenv").exists()
        || std::env::var("CONTAINER").as_deref() == Ok("1");

    if in_container {
        // Containerized: let the runtime deliver SIGTERM, no handler of our own
        axum::serve(listener, app).await?;
    } else {
        tokio::select! {
            result = axum::serve(listener, app) => {
                result?;
            }
            _ = async {
                #[cfg(unix)]
                {
                    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                        Ok(s) => s,
                        Err(_) => {
                            let _ = tokio::signal::ctrl_c().await;
                            return;
                        }
                    };
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                #[cfg(not(unix))]
                {
                    tokio::signal::ctrl_c().await
                }
            } => {
                tracing::info!("Received shutdown signal");
            }
        }
    }

    Ok(())
}
