//! Scheduled background maintenance.
//!
//! Two loops run for the life of the process: a daily snapshot and a
//! five-minute health probe. A failed probe triggers a restore attempt
//! from the newest snapshot.

use std::time::Duration;

use riposte_storage::Database;
use tokio::sync::watch;
use tracing::{info, warn};

/// Snapshot cadence.
const BACKUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Health probe cadence.
const HEALTH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Runs the maintenance loops until the shutdown flag flips.
pub async fn run(db: Database, mut shutdown: watch::Receiver<bool>) {
    let mut backup = tokio::time::interval(BACKUP_INTERVAL);
    let mut health = tokio::time::interval(HEALTH_INTERVAL);
    // Intervals fire immediately on the first tick; swallow those so the
    // first real run lands one period in.
    backup.tick().await;
    health.tick().await;

    loop {
        tokio::select! {
            _ = backup.tick() => run_backup(&db).await,
            _ = health.tick() => run_health_check(&db).await,
            _ = shutdown.changed() => {
                info!("Stopping background jobs");
                return;
            }
        }
    }
}

async fn run_backup(db: &Database) {
    match db.snapshot().await {
        Ok(path) => info!(path = %path.display(), "Scheduled snapshot written"),
        Err(e) => warn!("Scheduled snapshot failed: {}", e),
    }
}

/// Probe the database and fall back to the newest snapshot if it looks bad.
async fn run_health_check(db: &Database) {
    let report = match db.health() {
        Ok(report) => report,
        Err(e) => {
            warn!("Health check failed: {}", e);
            return;
        }
    };
    if report.ok {
        return;
    }

    warn!(
        integrity = %report.integrity,
        warnings = ?report.warnings,
        "Health check reporting problems, attempting restore"
    );
    match db.restore_latest().await {
        Ok(Some(path)) => info!(path = %path.display(), "Database restored from snapshot"),
        Ok(None) => warn!("No snapshot available to restore"),
        Err(e) => warn!("Restore failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_jobs_stop_on_shutdown() {
        let db = Database::in_memory().unwrap();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(db, rx));
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("jobs did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_scheduled_backup_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::with_path(dir.path().join("comments.db")).unwrap();

        run_backup(&db).await;

        let snapshots = std::fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .count();
        assert_eq!(snapshots, 1);
    }
}
