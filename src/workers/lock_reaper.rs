use crate::services::lock_manager::LockManager;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

/// Background worker that periodically reaps expired file locks.
pub async fn lock_reaper_worker(
    locks: LockManager,
    reap_interval_seconds: u64,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) {
    let mut tick = interval(Duration::from_secs(reap_interval_seconds));
    info!(interval_seconds = reap_interval_seconds, "lock reaper worker started");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("lock reaper worker shutting down");
                break;
            }
            _ = tick.tick() => {
                match locks.reap_expired().await {
                    Ok(count) if count > 0 => info!(count, "reaped expired file locks"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "failed to reap expired file locks"),
                }
            }
        }
    }

    info!("lock reaper worker stopped");
}
