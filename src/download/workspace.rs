//! Job-scoped temporary directories.
//!
//! Every job gets its own freshly created directory under the configured
//! temp root. A [`Workspace`] removes its tree exactly once: on an explicit
//! [`Workspace::release`] or, failing that, when it is dropped (early
//! return, error, panic unwinding).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Prefix of every workspace directory name
pub const WORKSPACE_PREFIX: &str = "relay-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace under {root}: {source}")]
    Allocation {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    pub fn user_message(&self) -> &'static str {
        "❌ An unexpected error occurred. Please try again later."
    }
}

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Hands out workspaces and counts acquire/release pairs.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    counters: Arc<Counters>,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Creates a new, empty, uniquely named directory.
    ///
    /// Fails only when the temp root is not writable.
    pub async fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        let path = self
            .root
            .join(format!("{}{}", WORKSPACE_PREFIX, uuid::Uuid::new_v4().simple()));

        fs_err::tokio::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Allocation {
                root: self.root.clone(),
                source,
            })?;
        // create_dir (not _all) so a name collision is an error instead of a shared directory
        fs_err::tokio::create_dir(&path)
            .await
            .map_err(|source| WorkspaceError::Allocation {
                root: self.root.clone(),
                source,
            })?;

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        log::debug!("[WORKSPACE] acquired {}", path.display());

        Ok(Workspace {
            path,
            counters: Arc::clone(&self.counters),
            released: false,
        })
    }

    pub fn acquired_count(&self) -> u64 {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> u64 {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Workspaces currently alive
    pub fn outstanding(&self) -> u64 {
        self.acquired_count().saturating_sub(self.released_count())
    }
}

/// An exclusively owned job directory.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    counters: Arc<Counters>,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively removes the directory. Errors are logged and swallowed.
    pub fn release(mut self) {
        self.remove_tree();
    }

    fn remove_tree(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // Sync removal so it also runs while unwinding outside a runtime
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("[WORKSPACE] failed to remove {}: {}", self.path.display(), e);
            }
        }
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        log::debug!("[WORKSPACE] released {}", self.path.display());
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove_tree();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_creates_unique_empty_dirs() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let a = manager.acquire().await.unwrap();
        let b = manager.acquire().await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert_eq!(std::fs::read_dir(a.path()).unwrap().count(), 0);
        assert!(a
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(WORKSPACE_PREFIX)));
        assert_eq!(manager.outstanding(), 2);
    }

    #[tokio::test]
    async fn test_release_removes_tree() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let ws = manager.acquire().await.unwrap();
        let path = ws.path().to_path_buf();
        std::fs::create_dir_all(path.join("nested/deeper")).unwrap();
        std::fs::write(path.join("nested/deeper/video.mp4"), b"data").unwrap();

        ws.release();

        assert!(!path.exists());
        assert_eq!(manager.acquired_count(), 1);
        assert_eq!(manager.released_count(), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_once() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let path = {
            let ws = manager.acquire().await.unwrap();
            ws.path().to_path_buf()
        };

        assert!(!path.exists());
        assert_eq!(manager.released_count(), 1);
    }

    #[tokio::test]
    async fn test_release_tolerates_already_deleted_dir() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let ws = manager.acquire().await.unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.release();

        assert_eq!(manager.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_acquire_fails_when_root_is_a_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let manager = WorkspaceManager::new(file.path());

        let result = manager.acquire().await;

        assert!(matches!(result, Err(WorkspaceError::Allocation { .. })));
        assert_eq!(manager.acquired_count(), 0);
    }
}
