//! Core SpeedStore implementation

use chrono::{DateTime, Utc};
use fs2::FileExt;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::value::SpeedValue;

/// Logical key of the single durable record.
pub const SPEED_KEY: &str = "speed";

/// File name of the record inside the store directory.
const RECORD_FILE: &str = "speed.json";

/// Capacity of the change-notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store record malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// On-disk shape of the committed speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedRecord {
    /// The committed speed.
    pub speed: SpeedValue,
    /// Commit counter, bumped on every write. Lets another process detect
    /// commits by polling, without a channel.
    pub version: u64,
    /// Wall-clock time of the last commit.
    pub updated_at: DateTime<Utc>,
}

/// Notification delivered to subscribers after a commit lands.
#[derive(Debug, Clone)]
pub struct SpeedChange {
    /// Logical key that changed (always [`SPEED_KEY`] today).
    pub key: &'static str,
    /// Previously committed value, if any.
    pub old: Option<SpeedValue>,
    /// Newly committed value.
    pub new: SpeedValue,
}

/// File-backed store for the committed playback speed.
///
/// Commits are last-writer-wins whole-record replaces; there is no
/// compare-and-swap, so concurrent writers race and the later physical write
/// wins. Clones share one notification channel: a commit through any clone
/// reaches every subscriber in the process, including the committer itself.
/// Independent `open()`s (other processes) observe commits through the
/// record's version counter instead.
#[derive(Clone)]
pub struct SpeedStore {
    /// Path of the record file.
    path: PathBuf,
    change_tx: broadcast::Sender<SpeedChange>,
}

impl SpeedStore {
    /// Open or create a store rooted at the given directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        debug!("opened speed store at {}", dir.display());
        Ok(Self {
            path: dir.join(RECORD_FILE),
            change_tx,
        })
    }

    /// Path of the record file.
    pub fn record_path(&self) -> &Path {
        &self.path
    }

    /// Committed speed, or `None` when nothing has been committed yet.
    /// Callers substitute the default; the store never self-seeds.
    pub fn read(&self) -> Result<Option<SpeedValue>, StoreError> {
        Ok(self.read_record()?.map(|record| record.speed))
    }

    /// Full on-disk record, for inspection and cross-process watching.
    pub fn read_record(&self) -> Result<Option<SpeedRecord>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Current commit counter; zero when nothing has been committed.
    pub fn version(&self) -> Result<u64, StoreError> {
        Ok(self.read_record()?.map(|record| record.version).unwrap_or(0))
    }

    /// Commit a new speed.
    ///
    /// The read-modify-write runs under an exclusive file lock and lands via
    /// tmp-file rename, so readers never observe a torn record. Subscribers
    /// are notified only after the record is durably in place.
    pub fn write(&self, value: SpeedValue) -> Result<(), StoreError> {
        let lock = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.path.with_extension("lock"))?;
        lock.lock_exclusive()?;
        let outcome = self.write_locked(value);
        // Lock released when `lock` drops; notify outside the critical section.
        let (old, record) = outcome?;

        debug!(
            "committed {}={} (version {})",
            SPEED_KEY, record.speed, record.version
        );
        let _ = self.change_tx.send(SpeedChange {
            key: SPEED_KEY,
            old,
            new: record.speed,
        });
        Ok(())
    }

    fn write_locked(&self, value: SpeedValue) -> Result<(Option<SpeedValue>, SpeedRecord), StoreError> {
        let previous = self.read_record()?;
        let record = SpeedRecord {
            speed: value,
            version: previous.as_ref().map(|r| r.version + 1).unwrap_or(1),
            updated_at: Utc::now(),
        };
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&record)?)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok((previous.map(|r| r.speed), record))
    }

    /// Subscribe to commit notifications. Late subscribers only see commits
    /// made after they subscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<SpeedChange> {
        self.change_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_absent_returns_none() {
        let temp = TempDir::new().unwrap();
        let store = SpeedStore::open(temp.path()).unwrap();
        assert!(store.read().unwrap().is_none());
        assert_eq!(store.version().unwrap(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let store = SpeedStore::open(temp.path()).unwrap();

        store.write(SpeedValue::from_f64(1.5)).unwrap();

        assert_eq!(store.read().unwrap(), Some(SpeedValue::from_f64(1.5)));
        let record = store.read_record().unwrap().unwrap();
        assert_eq!(record.version, 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let temp = TempDir::new().unwrap();
        // Two independent opens, as two processes would have.
        let a = SpeedStore::open(temp.path()).unwrap();
        let b = SpeedStore::open(temp.path()).unwrap();

        a.write(SpeedValue::from_f64(1.5)).unwrap();
        b.write(SpeedValue::from_f64(2.0)).unwrap();

        assert_eq!(a.read().unwrap(), Some(SpeedValue::from_f64(2.0)));
        assert_eq!(a.version().unwrap(), 2);
    }

    #[test]
    fn test_subscribers_hear_every_commit() {
        let temp = TempDir::new().unwrap();
        let store = SpeedStore::open(temp.path()).unwrap();
        let mut changes = store.subscribe();

        store.write(SpeedValue::from_f64(1.5)).unwrap();
        store.write(SpeedValue::from_f64(2.0)).unwrap();

        let first = changes.try_recv().unwrap();
        assert_eq!(first.key, SPEED_KEY);
        assert_eq!(first.old, None);
        assert_eq!(first.new, SpeedValue::from_f64(1.5));

        let second = changes.try_recv().unwrap();
        assert_eq!(second.old, Some(SpeedValue::from_f64(1.5)));
        assert_eq!(second.new, SpeedValue::from_f64(2.0));
    }

    #[test]
    fn test_clones_share_the_channel() {
        let temp = TempDir::new().unwrap();
        let store = SpeedStore::open(temp.path()).unwrap();
        let mut changes = store.subscribe();

        let clone = store.clone();
        clone.write(SpeedValue::from_f64(0.5)).unwrap();

        assert_eq!(changes.try_recv().unwrap().new, SpeedValue::from_f64(0.5));
    }

    #[test]
    fn test_open_fails_under_a_file() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        assert!(SpeedStore::open(blocker.join("store")).is_err());
    }

    #[test]
    fn test_write_fails_after_dir_removed() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("store");
        let store = SpeedStore::open(&dir).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        assert!(store.write(SpeedValue::from_f64(1.5)).is_err());
    }

    #[test]
    fn test_corrupt_record_is_a_format_error() {
        let temp = TempDir::new().unwrap();
        let store = SpeedStore::open(temp.path()).unwrap();
        fs::write(store.record_path(), "{ not json").unwrap();

        assert!(matches!(store.read(), Err(StoreError::Format(_))));
    }
}
