//! Run lock — a lease file guarding against overlapping cycles.
//!
//! The lease records who holds it and since when. A lease older than the
//! configured TTL is presumed abandoned (crashed run) and broken with a
//! warning; a live lease refuses the new cycle.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use daybrief_shared::{DaybriefError, Result, RunId};

/// Contents of the lease file.
#[derive(Debug, Serialize, Deserialize)]
struct Lease {
    run_id: RunId,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// Held for the duration of one cycle. Released explicitly on success;
/// the `Drop` impl is a best-effort backstop for early returns.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    released: bool,
}

impl RunLock {
    /// Acquire the lock, breaking a stale lease if one is found.
    pub fn acquire(path: &Path, run_id: &RunId, ttl_secs: u64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DaybriefError::io(parent, e))?;
        }

        if path.exists() {
            match read_lease(path) {
                Some(lease) => {
                    let age = Utc::now().signed_duration_since(lease.acquired_at);
                    if age.num_seconds() >= 0 && (age.num_seconds() as u64) < ttl_secs {
                        return Err(DaybriefError::locked(format!(
                            "another cycle (run {}, pid {}) holds the lock since {}",
                            lease.run_id, lease.pid, lease.acquired_at
                        )));
                    }
                    warn!(
                        run_id = %lease.run_id,
                        acquired_at = %lease.acquired_at,
                        "breaking stale run lock"
                    );
                }
                None => warn!(?path, "breaking unreadable run lock"),
            }
            std::fs::remove_file(path).map_err(|e| DaybriefError::io(path, e))?;
        }

        let lease = Lease {
            run_id: run_id.clone(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&lease)
            .map_err(|e| DaybriefError::locked(format!("serialize lease: {e}")))?;

        // create_new catches a race with a concurrently-starting cycle
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    DaybriefError::locked("another cycle acquired the lock concurrently")
                } else {
                    DaybriefError::io(path, e)
                }
            })?;
        file.write_all(json.as_bytes())
            .map_err(|e| DaybriefError::io(path, e))?;

        debug!(?path, %run_id, "run lock acquired");
        Ok(Self {
            path: path.to_path_buf(),
            released: false,
        })
    }

    /// Release the lock, removing the lease file.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        std::fs::remove_file(&self.path).map_err(|e| DaybriefError::io(&self.path, e))
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = ?self.path, error = %e, "failed to remove run lock on drop");
            }
        }
    }
}

fn read_lease(path: &Path) -> Option<Lease> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}
