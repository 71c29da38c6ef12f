//! Delivery ledger
//!
//! Freedesktop notification servers cannot enumerate what they are
//! showing, so the desktop adapter records each submission here and
//! clears it on release. Several alerter processes may share the file;
//! every read-modify-write happens under an exclusive lock on a sibling
//! `.lock` file.

use super::DeliveredNotification;
use crate::errors::ServiceError;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    #[serde(flatten)]
    notification: DeliveredNotification,
    /// Process waiting on the notification
    pid: u32,
}

/// File-backed record of delivered notifications
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

/// Default ledger location (~/.cache/alerter/delivered.json on Linux)
pub fn default_path() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("/tmp/alerter/delivered.json"),
        |dirs| dirs.cache_dir().join("alerter").join("delivered.json"),
    )
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Held for the duration of one ledger transaction
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.0.unlock();
    }
}

impl Ledger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<LockGuard, ServiceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_extension("lock"))?;
        file.lock_exclusive()?;
        Ok(LockGuard(file))
    }

    fn read(&self) -> Result<Vec<LedgerEntry>, ServiceError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, entries: &[LedgerEntry]) -> Result<(), ServiceError> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Run `f` over the entries under the lock, persisting if it returns true
    fn update<T>(
        &self,
        f: impl FnOnce(&mut Vec<LedgerEntry>) -> (T, bool),
    ) -> Result<T, ServiceError> {
        let _lock = self.lock()?;
        let mut entries = self.read()?;
        let before = entries.len();
        entries.retain(|e| process_alive(e.pid));
        let pruned = entries.len() != before;
        if pruned {
            tracing::debug!(pruned = before - entries.len(), "Dropped stale ledger entries");
        }
        let (result, changed) = f(&mut entries);
        if changed || pruned {
            self.write(&entries)?;
        }
        Ok(result)
    }

    /// Record a notification shown on behalf of this process
    pub fn record(&self, notification: DeliveredNotification) -> Result<(), ServiceError> {
        let pid = std::process::id();
        self.update(|entries| {
            entries.retain(|e| e.notification.id != notification.id);
            entries.push(LedgerEntry { notification, pid });
            ((), true)
        })
    }

    /// Forget a notification; returns the removed record if there was one
    pub fn remove(&self, id: &str) -> Result<Option<DeliveredNotification>, ServiceError> {
        self.update(|entries| match entries.iter().position(|e| e.notification.id == id) {
            Some(idx) => (Some(entries.remove(idx).notification), true),
            None => (None, false),
        })
    }

    /// Look up one record without changing the ledger
    pub fn get(&self, id: &str) -> Result<Option<DeliveredNotification>, ServiceError> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|n| n.id == id))
    }

    /// Close a recorded notification, forgetting it only once `close` succeeded
    ///
    /// Unknown ids are a no-op.
    pub fn dismiss_with(
        &self,
        id: &str,
        close: impl FnOnce(&DeliveredNotification) -> Result<(), ServiceError>,
    ) -> Result<(), ServiceError> {
        let Some(record) = self.get(id)? else {
            tracing::debug!(id, "Nothing to dismiss");
            return Ok(());
        };
        close(&record)?;
        self.remove(id)?;
        Ok(())
    }

    /// Live records ordered by delivery time
    pub fn entries(&self) -> Result<Vec<DeliveredNotification>, ServiceError> {
        let mut list: Vec<DeliveredNotification> = self.update(|entries| {
            (
                entries.iter().map(|e| e.notification.clone()).collect(),
                false,
            )
        })?;
        list.sort_by_key(|n| n.delivered_at);
        Ok(list)
    }
}
