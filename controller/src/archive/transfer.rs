use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{compress_directory, extract_archive};
use crate::errors::{ManagerError, TransferError};
use crate::http::{SnapshotKind, SolrClient};
use crate::shard::{archive_file_name, BackupTimestamp, CoreIdentity, ShardRef};
use crate::storage::ObjectStore;

/// Attempts and delay shared by compression, upload and download.
#[derive(Debug, Clone, Copy)]
pub struct TransferRetry {
    pub count: u32,
    pub wait: Duration,
}

/// A shard snapshot that was archived and uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ShardSnapshot {
    pub shard: ShardRef,
    pub snapshot_dir: PathBuf,
    pub archive_file: PathBuf,
}

/// Progress of a single shard restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Downloading,
    Extracting,
    RestoringRemote,
}

/// Per-shard archive transfer. One instance is shared by all shard tasks of a run.
pub struct ArchiveTransferWorker {
    store: ObjectStore,
    solr: Arc<SolrClient>,
    retry: TransferRetry,
}

impl ArchiveTransferWorker {
    pub fn new(store: ObjectStore, solr: Arc<SolrClient>, retry: TransferRetry) -> Self {
        Self { store, solr, retry }
    }

    /// Archives the snapshot of one shard and uploads it to `<bucket>/<timestamp>/`.
    ///
    /// A split shard's snapshot directory is renamed to its renumbered name first.
    pub async fn upload(
        &self,
        run_dir: &Path,
        bucket: &str,
        timestamp: &BackupTimestamp,
        shard: &ShardRef,
    ) -> Result<ShardSnapshot, ManagerError> {
        info!("Create archive for collection [{}], shard [{:?}]", shard.collection, shard.shard);

        let normalized = shard.normalized();
        let snapshot_dir = run_dir.join(normalized.snapshot_dir_name());

        if normalized != *shard {
            let split_dir = run_dir.join(shard.snapshot_dir_name());
            info!(
                "Renaming split shard snapshot [{}] to [{}]",
                split_dir.display(),
                snapshot_dir.display()
            );
            fs::rename(&split_dir, &snapshot_dir)
                .await
                .map_err(|e| TransferError::Filesystem {
                    path: split_dir.display().to_string(),
                    reason: e.to_string(),
                })?;
        }

        let archive_name = archive_file_name(timestamp, &normalized);
        let archive_file = run_dir.join(&archive_name);
        let snapshot_dir_name = normalized.snapshot_dir_name();

        self.with_retry(&format!("Creating archive [{}]", archive_name), || {
            compress_directory(&archive_file, run_dir, &snapshot_dir_name)
        })
        .await
        .map_err(|(attempts, reason)| TransferError::CompressionFailed {
            archive: archive_name.clone(),
            attempts,
            reason,
        })?;

        self.with_retry(&format!("Uploading [{}]", archive_name), || {
            self.store.copy_to(&archive_file, bucket, timestamp.as_str())
        })
        .await
        .map_err(|(attempts, reason)| TransferError::UploadFailed {
            archive: archive_name.clone(),
            attempts,
            reason,
        })?;

        info!(
            "Successfully created and uploaded archive for collection [{}], shard [{}]",
            normalized.collection,
            normalized.full_name()
        );

        Ok(ShardSnapshot {
            shard: normalized,
            snapshot_dir,
            archive_file,
        })
    }

    /// Downloads, extracts and restores the snapshot of one local core.
    ///
    /// The archive is fetched into `root_dir` unless it is already there, and is
    /// removed again once extraction and restore have been attempted. On failure
    /// the stage that failed is returned alongside the error.
    pub async fn restore(
        &self,
        root_dir: &Path,
        run_dir: &Path,
        bucket: &str,
        timestamp: &BackupTimestamp,
        core: &CoreIdentity,
    ) -> Result<ShardRef, (RestoreStage, ManagerError)> {
        let shard = core.shard_ref().normalized();
        let archive_name = archive_file_name(timestamp, &shard);
        let archive_file = root_dir.join(&archive_name);

        let mut stage = RestoreStage::Downloading;
        if fs::try_exists(&archive_file).await.unwrap_or(false) {
            debug!(
                "Archive [{}] already present, skipping download for [{}]",
                archive_name, shard
            );
        } else {
            info!(
                "Restoring backup for shard [{}] of collection [{}] ...",
                shard.full_name(),
                shard.collection
            );
            self.with_retry(&format!("Downloading [{}]", archive_name), || {
                self.store
                    .copy_from(bucket, timestamp.as_str(), &archive_name, root_dir)
            })
            .await
            .map_err(|(attempts, reason)| {
                let error = TransferError::DownloadFailed {
                    archive: archive_name.clone(),
                    attempts,
                    reason,
                };
                (stage, ManagerError::from(error))
            })?;
        }

        stage = RestoreStage::Extracting;
        let result = self
            .extract_and_restore(&archive_file, &archive_name, run_dir, core, &shard, &mut stage)
            .await;

        if let Err(e) = fs::remove_file(&archive_file).await {
            warn!("Could not delete archive [{}]: {}", archive_file.display(), e);
        }

        result.map(|_| shard).map_err(|e| (stage, e))
    }

    async fn extract_and_restore(
        &self,
        archive_file: &Path,
        archive_name: &str,
        run_dir: &Path,
        core: &CoreIdentity,
        shard: &ShardRef,
        stage: &mut RestoreStage,
    ) -> Result<(), ManagerError> {
        extract_archive(archive_file, run_dir)
            .await
            .map_err(|reason| TransferError::ExtractionFailed {
                archive: archive_name.to_string(),
                reason,
            })?;

        let snapshot_dir = run_dir.join(shard.snapshot_dir_name());
        if !fs::metadata(&snapshot_dir).await.is_ok_and(|m| m.is_dir()) {
            warn!(
                "Failed to prepare snapshot directory for shard [{}] of collection [{}]",
                shard.full_name(),
                shard.collection
            );
            return Err(TransferError::ExtractionFailed {
                archive: archive_name.to_string(),
                reason: format!("[{}] missing after extraction", snapshot_dir.display()),
            }
            .into());
        }

        *stage = RestoreStage::RestoringRemote;
        let core_name = core.core_name();
        let snapshot_name = shard.full_name();
        self.solr
            .trigger_restore(&core_name, &snapshot_name, run_dir)
            .await?;
        self.solr
            .await_completion(&core_name, &snapshot_name, SnapshotKind::Restore)
            .await?;

        info!(
            "Successfully restored backup for shard [{}] of collection [{}]",
            snapshot_name, shard.collection
        );
        Ok(())
    }

    /// Runs `operation` up to the configured number of attempts, waiting between
    /// failed attempts. Returns the attempt count and last error on exhaustion.
    async fn with_retry<F, Fut>(&self, label: &str, mut operation: F) -> Result<(), (u32, String)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.retry.count => {
                    warn!(
                        "{} failed (attempt {}/{}): {} ... retrying",
                        label, attempt, self.retry.count, e
                    );
                    sleep(self.retry.wait).await;
                }
                Err(e) => return Err((attempt, e)),
            }
        }
    }
}
