//! Object storage for backup archives
//!
//! Archives are stored under `<bucket>/<timestamp>/<archive file name>`. The
//! transfer itself is delegated: the `aws` backend shells out to the AWS CLI,
//! the `local` backend treats a directory (for example a mounted share) as
//! the bucket root.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::config::{StorageBackend, StorageConfig};
use crate::errors::ConfigError;

#[derive(Debug, Clone)]
pub enum ObjectStore {
    AwsCli { executable: String },
    Local { root: PathBuf },
}

impl ObjectStore {
    pub fn from_config(config: &StorageConfig) -> Result<Self, ConfigError> {
        match config.backend {
            StorageBackend::Aws => Ok(ObjectStore::AwsCli {
                executable: config.aws_cli.clone(),
            }),
            StorageBackend::Local => {
                let root = config.local_root.clone().ok_or_else(|| ConfigError::InvalidValue {
                    field: "storage.local_root".to_string(),
                    reason: "required for the local storage backend".to_string(),
                })?;
                Ok(ObjectStore::Local { root })
            }
        }
    }

    /// Copies a local file to `<bucket>/<prefix>/`.
    pub async fn copy_to(&self, file: &Path, bucket: &str, prefix: &str) -> Result<(), String> {
        let file_name = file
            .file_name()
            .ok_or_else(|| format!("[{}] has no file name", file.display()))?;

        match self {
            ObjectStore::AwsCli { executable } => {
                let target = format!("s3://{}/{}/", bucket, prefix);
                run_command(executable, &["s3", "cp", &file.to_string_lossy(), &target]).await
            }
            ObjectStore::Local { root } => {
                let target_dir = root.join(bucket).join(prefix);
                fs::create_dir_all(&target_dir)
                    .await
                    .map_err(|e| format!("Failed to create [{}]: {}", target_dir.display(), e))?;
                let target = target_dir.join(file_name);
                debug!("Copying [{}] to [{}]", file.display(), target.display());
                fs::copy(file, &target)
                    .await
                    .map(|_| ())
                    .map_err(|e| format!("Failed to copy to [{}]: {}", target.display(), e))
            }
        }
    }

    /// Copies `<bucket>/<prefix>/<file_name>` into a local directory.
    pub async fn copy_from(
        &self,
        bucket: &str,
        prefix: &str,
        file_name: &str,
        destination_dir: &Path,
    ) -> Result<(), String> {
        match self {
            ObjectStore::AwsCli { executable } => {
                let source = format!("s3://{}/{}/{}", bucket, prefix, file_name);
                let mut destination = destination_dir.to_string_lossy().to_string();
                if !destination.ends_with('/') {
                    destination.push('/');
                }
                run_command(executable, &["s3", "cp", &source, &destination]).await
            }
            ObjectStore::Local { root } => {
                let source = root.join(bucket).join(prefix).join(file_name);
                let target = destination_dir.join(file_name);
                debug!("Copying [{}] to [{}]", source.display(), target.display());
                fs::copy(&source, &target)
                    .await
                    .map(|_| ())
                    .map_err(|e| format!("Failed to copy [{}]: {}", source.display(), e))
            }
        }
    }
}

async fn run_command(executable: &str, args: &[&str]) -> Result<(), String> {
    debug!("Executing [{} {}]", executable, args.join(" "));

    let output = AsyncCommand::new(executable)
        .args(args)
        .output()
        .await
        .map_err(|e| format!("Failed to spawn {}: {}", executable, e))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "{} exited with code {}: {}",
            executable,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_store_round_trip_keeps_bucket_layout() {
        let bucket_root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = ObjectStore::Local {
            root: bucket_root.path().to_path_buf(),
        };

        let archive = work.path().join("backup_202401011200_c_shard1.tar.gz");
        std::fs::write(&archive, b"archive").unwrap();

        store.copy_to(&archive, "bucket", "202401011200").await.unwrap();
        assert!(bucket_root
            .path()
            .join("bucket/202401011200/backup_202401011200_c_shard1.tar.gz")
            .is_file());

        let download = TempDir::new().unwrap();
        store
            .copy_from(
                "bucket",
                "202401011200",
                "backup_202401011200_c_shard1.tar.gz",
                download.path(),
            )
            .await
            .unwrap();
        assert!(download
            .path()
            .join("backup_202401011200_c_shard1.tar.gz")
            .is_file());
    }

    #[tokio::test]
    async fn test_failing_cli_reports_exit_code() {
        let store = ObjectStore::AwsCli {
            executable: "false".to_string(),
        };
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("archive.tar.gz");
        std::fs::write(&file, b"x").unwrap();

        let err = store.copy_to(&file, "bucket", "prefix").await.unwrap_err();
        assert!(err.contains("exited with code 1"));
    }
}
