//! Gateway lock
//!
//! Advisory exclusive lock (`flock(2)`) on a lock file, held for the whole
//! load-mutate-persist sequence of an operation across both stores. Two
//! invocations therefore never interleave their reads and atomic replaces.
//! The lock is released when the guard is dropped or the process exits.

use crate::error::{PeerSyncError, PeerSyncResult};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Held gateway lock
#[derive(Debug)]
pub struct GatewayLock {
    file: File,
    path: PathBuf,
}

impl GatewayLock {
    /// Acquire the lock, retrying until `timeout` has passed.
    pub async fn acquire(path: &Path, timeout: Duration) -> PeerSyncResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| PeerSyncError::Load {
                path: path.to_path_buf(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            match try_lock(&file) {
                Ok(true) => {
                    tracing::debug!("Acquired gateway lock {}", path.display());
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Ok(false) if Instant::now() < deadline => tokio::time::sleep(RETRY_INTERVAL).await,
                Ok(false) => {
                    return Err(PeerSyncError::Locked {
                        path: path.to_path_buf(),
                    })
                }
                Err(source) => {
                    return Err(PeerSyncError::Load {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }

    /// Lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for GatewayLock {
    fn drop(&mut self) {
        unlock(&self.file);
        tracing::debug!("Released gateway lock {}", self.path.display());
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;

    // SAFETY: see try_lock
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

// TODO: LockFileEx on Windows; until then the lock is a no-op there.
#[cfg(not(unix))]
fn try_lock(_file: &File) -> std::io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wgpeer.lock");

        let held = GatewayLock::acquire(&path, Duration::from_secs(1)).await.unwrap();
        let err = GatewayLock::acquire(&path, Duration::from_millis(120))
            .await
            .unwrap_err();
        assert!(matches!(err, PeerSyncError::Locked { .. }));

        drop(held);
        assert!(GatewayLock::acquire(&path, Duration::from_millis(120)).await.is_ok());
    }

    #[tokio::test]
    async fn test_waiting_does_not_block_the_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".wgpeer.lock");
        let held = GatewayLock::acquire(&path, Duration::from_secs(1)).await.unwrap();

        // the release is scheduled on the same current-thread runtime the
        // waiter runs on, so it only happens if the waiter yields
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(held);
        });
        assert!(GatewayLock::acquire(&path, Duration::from_secs(5)).await.is_ok());
        release.await.unwrap();
    }
}
