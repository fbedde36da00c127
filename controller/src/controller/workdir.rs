use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::errors::PreconditionError;
use crate::shard::BackupTimestamp;

/// The backup root shared by every shard of a run.
///
/// Acquired at the start of a backup or restore and released at the end of
/// it, on success and failure alike. Releasing removes every entry below the
/// root unless cleanup was disabled.
pub struct WorkingDirectory {
    root: PathBuf,
    cleanup: bool,
}

impl WorkingDirectory {
    /// Acquires the root for a backup. The root must be empty.
    pub async fn acquire_empty(root: &Path, cleanup: bool) -> Result<Self, PreconditionError> {
        create_dir(root).await?;

        let mut entries = fs::read_dir(root).await.map_err(|e| unavailable(root, e))?;
        if entries
            .next_entry()
            .await
            .map_err(|e| unavailable(root, e))?
            .is_some()
        {
            return Err(PreconditionError::WorkingDirectoryNotEmpty {
                path: root.display().to_string(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            cleanup,
        })
    }

    /// Acquires the root for a restore, creating it if needed. Existing
    /// content is kept so an interrupted restore can resume.
    pub async fn acquire(root: &Path, cleanup: bool) -> Result<Self, PreconditionError> {
        create_dir(root).await?;
        Ok(Self {
            root: root.to_path_buf(),
            cleanup,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, timestamp: &BackupTimestamp) -> PathBuf {
        self.root.join(timestamp.as_str())
    }

    pub async fn ensure_run_dir(&self, timestamp: &BackupTimestamp) -> Result<PathBuf, PreconditionError> {
        let run_dir = self.run_dir(timestamp);
        create_dir(&run_dir).await?;
        Ok(run_dir)
    }

    /// Ends the run. Must only be called once every shard task has been joined.
    pub async fn release(self) {
        if self.cleanup {
            clean_up(&self.root).await;
        } else {
            info!("Cleanup disabled, keeping [{}]", self.root.display());
        }
    }
}

/// Removes every file and directory below `root`, keeping `root` itself.
pub async fn clean_up(root: &Path) {
    info!("Cleaning up backup directory ...");

    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not read backup directory [{}]: {}", root.display(), e);
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Could not list backup directory [{}]: {}", root.display(), e);
                break;
            }
        };

        let path = entry.path();
        let removal = match entry.file_type().await {
            Ok(file_type) if file_type.is_dir() => fs::remove_dir_all(&path).await.map(|_| "directory"),
            Ok(_) => fs::remove_file(&path).await.map(|_| "file"),
            Err(e) => Err(e),
        };

        match removal {
            Ok(kind) => info!("Removed {} [{}]", kind, path.display()),
            Err(e) => warn!("Could not delete [{}]: {}", path.display(), e),
        }
    }
}

async fn create_dir(path: &Path) -> Result<(), PreconditionError> {
    fs::create_dir_all(path).await.map_err(|e| unavailable(path, e))
}

fn unavailable(path: &Path, e: std::io::Error) -> PreconditionError {
    PreconditionError::WorkingDirectoryUnavailable {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_empty_rejects_leftovers() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("leftover.tar.gz"), b"x").unwrap();

        let err = WorkingDirectory::acquire_empty(root.path(), true)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PreconditionError::WorkingDirectoryNotEmpty { .. }));
        assert!(root.path().join("leftover.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_release_removes_files_and_directories() {
        let root = TempDir::new().unwrap();
        let workdir = WorkingDirectory::acquire_empty(root.path(), true).await.unwrap();

        let timestamp = BackupTimestamp::parse("202401011200").unwrap();
        let run_dir = workdir.ensure_run_dir(&timestamp).await.unwrap();
        std::fs::create_dir_all(run_dir.join("snapshot.books_shard1")).unwrap();
        std::fs::write(root.path().join("backup.tar.gz"), b"x").unwrap();

        workdir.release().await;

        assert!(root.path().exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_release_without_cleanup_keeps_content() {
        let root = TempDir::new().unwrap();
        let workdir = WorkingDirectory::acquire(root.path(), false).await.unwrap();
        std::fs::write(root.path().join("backup.tar.gz"), b"x").unwrap();

        workdir.release().await;

        assert!(root.path().join("backup.tar.gz").exists());
    }
}
