// Data-change notifications: mutating services publish, the cache refresher
// consumes and overwrites the cached projection (last-writer-wins).

use tokio::sync::broadcast;

use crate::cache::TtlCache;
use crate::models::Scanner;

#[derive(Debug, Clone)]
pub enum DataChange {
    Scanner(Scanner),
}

pub fn channel(capacity: usize) -> broadcast::Sender<DataChange> {
    let (tx, _) = broadcast::channel(capacity);
    tx
}

/// Keeps the scanner cache in step with mutations for as long as the channel
/// stays open.
pub fn spawn_cache_refresher(
    mut rx: broadcast::Receiver<DataChange>,
    scanner_cache: TtlCache<Scanner>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(DataChange::Scanner(scanner)) => {
                    tracing::debug!(scanner_id = scanner.id, "refreshing cached scanner");
                    scanner_cache.insert(scanner.id, scanner).await;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Skipped entries expire via TTL anyway.
                    tracing::warn!(missed, "cache refresher lagged behind data-change events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Cache refresher shutting down");
    })
}
