//! Background trigger for the reconnect sweep.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use artfolio_backend::{ConnectivitySignal, KeyValueStore, ObjectStore, RecordTable};

use crate::coordinator::SyncCoordinator;

/// Watch a connectivity signal and sweep pending operations on every
/// offline-to-online transition.
///
/// Runs until the signal's sender is dropped. Spawn it alongside the
/// coordinator:
///
/// ```ignore
/// tokio::spawn(run_reconnect_watcher(coordinator.clone(), signal.watch()));
/// ```
pub async fn run_reconnect_watcher<S, T, K, C>(
    coordinator: Arc<SyncCoordinator<S, T, K, C>>,
    mut online: watch::Receiver<bool>,
) where
    S: ObjectStore + Send + Sync + 'static,
    T: RecordTable + Send + Sync + 'static,
    K: KeyValueStore + Send + Sync + 'static,
    C: ConnectivitySignal + Send + Sync + 'static,
{
    let mut was_online = *online.borrow();
    info!("Reconnect watcher started (online: {})", was_online);

    while online.changed().await.is_ok() {
        let is_online = *online.borrow_and_update();
        if is_online && !was_online {
            debug!("Connectivity restored, sweeping pending operations");
            match coordinator.sweep_pending().await {
                Ok(report) => {
                    if report.attempted > 0 {
                        info!(
                            "Reconnect sweep: {} attempted, {} succeeded, {} failed",
                            report.attempted, report.succeeded, report.failed
                        );
                    }
                }
                Err(err) => error!("Reconnect sweep failed: {}", err),
            }
        }
        was_online = is_online;
    }

    info!("Reconnect watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{SyncConfig, UploadRequest};
    use artfolio_backend::{
        MemoryKeyValueStore, MemoryObjectStore, MemoryRecordTable, SwitchableConnectivity,
    };
    use artfolio_common::{MediaKind, OwnerId};
    use std::time::Duration;

    #[tokio::test]
    async fn test_watcher_sweeps_on_reconnect() {
        let objects = Arc::new(MemoryObjectStore::new());
        let table = Arc::new(MemoryRecordTable::new());
        let kv = Arc::new(MemoryKeyValueStore::new());
        let connectivity = Arc::new(SwitchableConnectivity::offline());
        let config = SyncConfig {
            base_delay: Duration::from_millis(1),
            ..SyncConfig::default()
        };
        let coordinator = Arc::new(SyncCoordinator::new(
            objects,
            table.clone(),
            kv,
            connectivity.clone(),
            config,
        ));

        let uploaded = coordinator
            .upload(UploadRequest {
                owner: OwnerId::new("alice").unwrap(),
                kind: MediaKind::Image,
                title: "Sunset".to_string(),
                description: String::new(),
                file_name: "sunset.png".to_string(),
                data: b"bytes".to_vec(),
            })
            .await
            .unwrap();

        let watcher = tokio::spawn(run_reconnect_watcher(
            coordinator.clone(),
            connectivity.watch(),
        ));

        connectivity.set_online(true);

        // The sweep runs in the background; wait for the row to land.
        let mut confirmed = false;
        for _ in 0..100 {
            if table.row(&uploaded.record.id).is_some() {
                confirmed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(confirmed, "pending upload was not replayed");

        drop(connectivity);
        watcher.abort();
    }
}
