//! Database snapshots and restore.
//!
//! Snapshots are taken with `VACUUM INTO` so they are consistent even while
//! the writer is busy, then gzip-compressed. Only the newest
//! [`RETAIN_SNAPSHOTS`] files are kept.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rusqlite::backup::Backup;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::Result;

/// How many snapshots to keep.
pub const RETAIN_SNAPSHOTS: usize = 7;

const SNAPSHOT_PREFIX: &str = "comments-";
const SNAPSHOT_SUFFIX: &str = ".db.gz";

/// Manages snapshot files in a backup directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(backup_dir: PathBuf) -> Self {
        Self { backup_dir }
    }

    /// Write a compressed snapshot of the database.
    ///
    /// Snapshots are named by date, so a second snapshot on the same day
    /// replaces the first.
    pub fn snapshot(&self, conn: &Connection) -> Result<PathBuf> {
        fs::create_dir_all(&self.backup_dir)?;

        let stamp = Utc::now().format("%Y-%m-%d");
        let raw = self.backup_dir.join(format!("{SNAPSHOT_PREFIX}{stamp}.db"));
        let packed = self
            .backup_dir
            .join(format!("{SNAPSHOT_PREFIX}{stamp}{SNAPSHOT_SUFFIX}"));

        // VACUUM INTO refuses to overwrite, so drop leftovers from a
        // crashed earlier run.
        if raw.exists() {
            fs::remove_file(&raw)?;
        }

        let raw_str = raw.to_string_lossy().to_string();
        conn.execute("VACUUM INTO ?1", [raw_str])?;

        let mut reader = BufReader::new(File::open(&raw)?);
        let mut encoder = GzEncoder::new(File::create(&packed)?, Compression::default());
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?;
        fs::remove_file(&raw)?;

        let pruned = self.prune()?;
        if pruned > 0 {
            debug!("Pruned {} old snapshot(s)", pruned);
        }

        info!("Database snapshot written to {}", packed.display());
        Ok(packed)
    }

    /// Delete snapshots beyond the retention limit. Returns how many were
    /// removed.
    pub fn prune(&self) -> Result<usize> {
        let snapshots = self.snapshots()?;
        let mut removed = 0;

        if snapshots.len() > RETAIN_SNAPSHOTS {
            for old in &snapshots[..snapshots.len() - RETAIN_SNAPSHOTS] {
                fs::remove_file(old)?;
                removed += 1;
            }
        }

        Ok(removed)
    }

    /// Path of the newest snapshot, if any exist.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        Ok(self.snapshots()?.pop())
    }

    /// Replace the live database with the contents of a snapshot.
    ///
    /// The caller must hold the only connection; in practice this runs on
    /// the writer thread.
    pub fn restore_from(&self, conn: &mut Connection, snapshot: &Path) -> Result<()> {
        let tmp = self.backup_dir.join("restore.tmp.db");

        let mut decoder = GzDecoder::new(BufReader::new(File::open(snapshot)?));
        let mut out = File::create(&tmp)?;
        std::io::copy(&mut decoder, &mut out)?;
        drop(out);

        let source = Connection::open(&tmp)?;
        {
            let backup = Backup::new(&source, conn)?;
            backup.run_to_completion(100, Duration::from_millis(10), None)?;
        }
        drop(source);
        fs::remove_file(&tmp).ok();

        info!("Database restored from {}", snapshot.display());
        Ok(())
    }

    /// Restore the newest snapshot. Returns which file was used, or `None`
    /// when no snapshot exists.
    pub fn restore_latest(&self, conn: &mut Connection) -> Result<Option<PathBuf>> {
        match self.latest()? {
            Some(snapshot) => {
                self.restore_from(conn, &snapshot)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// All snapshot files, oldest first. Date-stamped names sort
    /// chronologically.
    fn snapshots(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();

        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => return Err(e.into()),
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(SNAPSHOT_PREFIX) && name.ends_with(SNAPSHOT_SUFFIX) {
                found.push(entry.path());
            }
        }

        found.sort();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewComment;
    use crate::pool::ConnectionPool;
    use crate::repository::CommentsRepo;
    use riposte_core::CommentStatus;

    fn sample() -> NewComment {
        NewComment {
            article_id: "post-1".to_string(),
            author_name: "Ada".to_string(),
            author_email: "ada@example.com".to_string(),
            content: "keep me".to_string(),
            status: CommentStatus::Approved,
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_writes_compressed_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("backups"));

        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();
        CommentsRepo::insert(&conn, sample()).unwrap();

        let path = manager.snapshot(&conn).unwrap();
        assert!(path.to_string_lossy().ends_with(".db.gz"));
        assert!(path.exists());

        // The uncompressed intermediate is cleaned up.
        let raw = path.with_extension("");
        assert!(!raw.exists());
    }

    #[test]
    fn test_snapshot_same_day_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf());

        let pool = ConnectionPool::in_memory().unwrap();
        let conn = pool.get().unwrap();

        let first = manager.snapshot(&conn).unwrap();
        let second = manager.snapshot(&conn).unwrap();
        assert_eq!(first, second);

        let count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().to_path_buf();

        for day in 1..=9 {
            let name = format!("comments-2026-01-{:02}.db.gz", day);
            fs::write(backups.join(name), b"x").unwrap();
        }
        fs::write(backups.join("unrelated.txt"), b"x").unwrap();

        let manager = BackupManager::new(backups.clone());
        assert_eq!(manager.prune().unwrap(), 2);

        assert!(!backups.join("comments-2026-01-01.db.gz").exists());
        assert!(!backups.join("comments-2026-01-02.db.gz").exists());
        assert!(backups.join("comments-2026-01-03.db.gz").exists());
        assert!(backups.join("unrelated.txt").exists());

        let latest = manager.latest().unwrap().unwrap();
        assert!(latest.ends_with("comments-2026-01-09.db.gz"));
    }

    #[test]
    fn test_latest_on_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("never-created"));
        assert!(manager.latest().unwrap().is_none());
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf());

        let pool = ConnectionPool::in_memory().unwrap();
        {
            let conn = pool.get().unwrap();
            CommentsRepo::insert(&conn, sample()).unwrap();
            manager.snapshot(&conn).unwrap();
        }

        let empty = ConnectionPool::in_memory().unwrap();
        let mut conn = empty.get().unwrap();
        assert_eq!(CommentsRepo::count(&conn).unwrap(), 0);

        let used = manager.restore_latest(&mut conn).unwrap();
        assert!(used.is_some());
        assert_eq!(CommentsRepo::count(&conn).unwrap(), 1);

        let comment = CommentsRepo::list_paged(&conn, None, 1, 0).unwrap();
        assert_eq!(comment[0].content, "keep me");
    }

    #[test]
    fn test_restore_latest_without_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().to_path_buf());

        let pool = ConnectionPool::in_memory().unwrap();
        let mut conn = pool.get().unwrap();
        assert!(manager.restore_latest(&mut conn).unwrap().is_none());
    }
}
