use serde::Deserialize;
use std::str::FromStr;

use crate::jobs::JobScheduleConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scanner: ScannerConfig,
    pub report: ReportConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    pub events: EventsConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Hours without traffic before an active scanner is marked out_of_order.
    pub inactivity_deadline_hours: u32,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_earth_radius_km")]
    pub earth_radius_km: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            earth_radius_km: default_earth_radius_km(),
        }
    }
}

fn default_earth_radius_km() -> f64 {
    6371.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Max number of data-change events kept in the broadcast channel (slow consumers may lag).
    pub broadcast_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    pub status_check: JobScheduleConfig,
    pub traffic_report: JobScheduleConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.scanner.inactivity_deadline_hours > 0,
            "scanner.inactivity_deadline_hours must be > 0, got {}",
            self.scanner.inactivity_deadline_hours
        );
        anyhow::ensure!(
            self.scanner.cache_ttl_secs > 0,
            "scanner.cache_ttl_secs must be > 0, got {}",
            self.scanner.cache_ttl_secs
        );
        anyhow::ensure!(
            self.scanner.cache_capacity > 0,
            "scanner.cache_capacity must be > 0, got {}",
            self.scanner.cache_capacity
        );
        anyhow::ensure!(
            self.report.cache_ttl_secs > 0,
            "report.cache_ttl_secs must be > 0, got {}",
            self.report.cache_ttl_secs
        );
        anyhow::ensure!(
            self.report.cache_capacity > 0,
            "report.cache_capacity must be > 0, got {}",
            self.report.cache_capacity
        );
        anyhow::ensure!(
            self.geo.earth_radius_km > 0.0,
            "geo.earth_radius_km must be > 0, got {}",
            self.geo.earth_radius_km
        );
        anyhow::ensure!(
            self.events.broadcast_capacity > 0,
            "events.broadcast_capacity must be > 0, got {}",
            self.events.broadcast_capacity
        );
        self.validate_schedule("jobs.status_check", &self.jobs.status_check)?;
        self.validate_schedule("jobs.traffic_report", &self.jobs.traffic_report)?;
        Ok(())
    }

    /// A disabled job may carry any schedule string; an enabled one must parse.
    fn validate_schedule(&self, name: &str, job: &JobScheduleConfig) -> anyhow::Result<()> {
        if job.enabled {
            cron::Schedule::from_str(&job.schedule)
                .map_err(|e| anyhow::anyhow!("{}.schedule is not a valid cron expression: {}", name, e))?;
        }
        Ok(())
    }
}
