// Cron-driven job runner. Each job runs inline in its own loop, so a run
// never overlaps a prior run of the same job.

use serde::Deserialize;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct JobScheduleConfig {
    pub enabled: bool,
    /// Cron expression with seconds field, e.g. "0 0 * * * *" = hourly.
    pub schedule: String,
}

/// Spawns a job loop: sleep to the next cron fire time (local time), run,
/// repeat. A disabled job or an unparseable schedule never runs.
pub fn spawn_job<F, Fut>(
    name: &'static str,
    config: JobScheduleConfig,
    run: F,
) -> tokio::task::JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    tokio::spawn(async move {
        if !config.enabled {
            info!(job = name, "job disabled");
            return;
        }
        let Ok(schedule) = cron::Schedule::from_str(&config.schedule) else {
            warn!(job = name, schedule = %config.schedule, "invalid schedule; job will not run");
            return;
        };
        info!(job = name, schedule = %config.schedule, "job scheduled");
        loop {
            let now = chrono::Local::now();
            let Some(next) = schedule.after(&now).next() else {
                warn!(job = name, "no upcoming fire time; job stopped");
                return;
            };
            let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
            tokio::time::sleep(delay).await;
            if let Err(e) = run().await {
                warn!(job = name, error = %e, "job run failed");
            }
        }
    })
}
