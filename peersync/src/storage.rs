//! Document storage port
//!
//! Both durable stores (gateway configuration and registry) are read and
//! written as whole documents through [`DocumentStore`]. The file store
//! replaces the target atomically: the new content goes to a temporary file
//! in the same directory, is synced, restricted to owner read/write and then
//! renamed over the original, so a reader sees either the old or the new
//! document and never a partial one.

use crate::error::{PeerSyncError, PeerSyncResult};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Owner read/write only
pub const STORE_MODE: u32 = 0o600;

/// Whole-document load/persist.
pub trait DocumentStore: Send + Sync {
    /// Current content, or `None` when the document does not exist yet.
    fn load(&self) -> PeerSyncResult<Option<String>>;

    /// Replace the document with `contents`.
    fn persist(&self, contents: &str) -> PeerSyncResult<()>;

    /// Human-readable location, used in log lines.
    fn location(&self) -> String;
}

/// File backed store with atomic replace.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl DocumentStore for FileStore {
    fn load(&self) -> PeerSyncResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PeerSyncError::Load {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn persist(&self, contents: &str) -> PeerSyncResult<()> {
        let failed = |source| PeerSyncError::Persistence {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(self.directory()).map_err(failed)?;
        tmp.write_all(contents.as_bytes()).map_err(failed)?;
        tmp.as_file().sync_all().map_err(failed)?;
        restrict_permissions(tmp.path()).map_err(failed)?;
        tmp.persist(&self.path).map_err(|e| failed(e.error))?;
        restrict_permissions(&self.path).map_err(failed)?;
        sync_directory(self.directory());

        tracing::debug!("Persisted {} ({} bytes)", self.path.display(), contents.len());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Set owner-only permissions.
#[cfg(unix)]
pub(crate) fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(STORE_MODE))
}

#[cfg(not(unix))]
pub(crate) fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn sync_directory(dir: &Path) {
    // rename durability; failure only loses the fsync, not the write
    if let Err(e) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!("Directory sync of {} failed: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) {}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStore {
    /// Empty (absent) document
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `text`
    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(text.into())),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make every following `persist` fail
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Current content
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> PeerSyncResult<Option<String>> {
        Ok(self.contents.lock().clone())
    }

    fn persist(&self, contents: &str) -> PeerSyncResult<()> {
        if *self.fail_writes.lock() {
            return Err(PeerSyncError::Persistence {
                path: PathBuf::from(self.location()),
                source: std::io::Error::new(std::io::ErrorKind::Other, "write refused"),
            });
        }
        *self.contents.lock() = Some(contents.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("peers.csv"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_persist_replaces_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wg0.conf");
        std::fs::write(&path, "old\n").unwrap();

        let store = FileStore::new(&path);
        store.persist("new\n").unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some("new\n"));
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_persist_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peers.csv");
        std::fs::write(&path, "x").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        FileStore::new(&path).persist("y").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, STORE_MODE);
    }

    #[test]
    fn test_persist_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing").join("wg0.conf"));
        assert!(matches!(
            store.persist("x"),
            Err(PeerSyncError::Persistence { .. })
        ));
    }

    #[test]
    fn test_memory_store_write_failure() {
        let store = MemoryStore::with_contents("a");
        store.fail_writes(true);
        assert!(store.persist("b").is_err());
        assert_eq!(store.contents().as_deref(), Some("a"));
    }
}
