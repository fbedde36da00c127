//! Backup and restore orchestration
//!
//! # Backup
//!
//! 1. The backup root must be empty, otherwise it is cleaned and the run aborts
//! 2. Hard commit on every locally hosted collection, then wait for it to settle
//! 3. Trigger and await a Solr backup for every local core
//! 4. Archive and upload every `snapshot.*` directory, one task per shard
//! 5. Clean the backup root
//!
//! # Restore
//!
//! Repeated sweeps over the local cores. Every core whose snapshot directory
//! is not yet present, and which has no restore task running, gets a task
//! that downloads, extracts and restores its archive. All tasks are joined
//! before the backup root is cleaned.

pub mod workdir;

pub use workdir::WorkingDirectory;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveTransferWorker, RestoreStage, ShardSnapshot, TransferRetry};
use crate::config::Config;
use crate::errors::{ManagerError, ManagerResult};
use crate::http::{SnapshotKind, SolrClient};
use crate::shard::{BackupTimestamp, CoreIdentity, ShardRef};
use crate::storage::ObjectStore;

/// Result of a successful backup run.
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub timestamp: BackupTimestamp,
    pub snapshots: Vec<ShardSnapshot>,
}

/// A shard whose restore did not complete.
#[derive(Debug, Clone)]
pub struct ShardFailure {
    pub core_name: String,
    pub stage: RestoreStage,
    pub error: String,
}

/// Outcome of a restore run.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    pub restored: Vec<ShardRef>,
    pub failed: Vec<ShardFailure>,
}

type RestoreOutcome = (String, Result<ShardRef, (RestoreStage, ManagerError)>);

pub struct BackupController {
    config: Arc<Config>,
    solr: Arc<SolrClient>,
    worker: Arc<ArchiveTransferWorker>,
}

impl BackupController {
    pub fn new(config: Arc<Config>) -> ManagerResult<Self> {
        config.validate()?;

        let solr = Arc::new(SolrClient::new(&config)?);
        let store = ObjectStore::from_config(&config.storage)?;
        let worker = Arc::new(ArchiveTransferWorker::new(
            store,
            solr.clone(),
            TransferRetry {
                count: config.transfer_retry_count,
                wait: config.transfer_retry_wait(),
            },
        ));

        Ok(Self {
            config,
            solr,
            worker,
        })
    }

    fn root_dir(&self) -> &Path {
        &self.config.backup_root_dir
    }

    /// Creates a backup of every locally hosted core and uploads it to `bucket`.
    ///
    /// Failures are logged here; the returned error is informational and the
    /// backup root is cleaned either way.
    pub async fn create_backup(&self, bucket: &str, cleanup: bool) -> ManagerResult<BackupReport> {
        let workdir = match WorkingDirectory::acquire_empty(self.root_dir(), cleanup).await {
            Ok(workdir) => workdir,
            Err(e) => {
                error!("ERROR Backup failed: {}", e);
                // Leftovers of an interrupted run would block every later run
                if cleanup {
                    workdir::clean_up(self.root_dir()).await;
                }
                return Err(e.into());
            }
        };

        let result = self.run_backup(&workdir, bucket).await;
        workdir.release().await;

        match result {
            Ok(report) => {
                info!(
                    "Backup [{}] completed with {} shard archives",
                    report.timestamp,
                    report.snapshots.len()
                );
                Ok(report)
            }
            Err(e) => {
                error!("ERROR Backup failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_backup(&self, workdir: &WorkingDirectory, bucket: &str) -> ManagerResult<BackupReport> {
        let timestamp = BackupTimestamp::now();
        let run_dir = workdir.run_dir(&timestamp);

        self.trigger_local_commit().await?;
        self.backup_local_shards(&timestamp, &run_dir).await?;
        let snapshots = self.store_local_backup(bucket, &timestamp, &run_dir).await?;

        Ok(BackupReport {
            timestamp,
            snapshots,
        })
    }

    async fn trigger_local_commit(&self) -> ManagerResult<()> {
        let mut collections = BTreeSet::new();
        for core_name in self.solr.list_local_cores().await {
            let identity = CoreIdentity::parse(&core_name)?;
            collections.insert(identity.collection().to_string());
        }

        for collection in &collections {
            self.solr.commit(collection).await?;
        }

        info!("Waiting for hard commits to finish ...");
        sleep(self.config.commit_wait()).await;
        info!(
            "Successfully triggered hard commit for all locally hosted collections: {:?}",
            collections
        );
        Ok(())
    }

    async fn backup_local_shards(&self, timestamp: &BackupTimestamp, run_dir: &Path) -> ManagerResult<()> {
        info!("Start creating local backup for timestamp [{}]", timestamp);

        for core_name in self.solr.list_local_cores().await {
            let identity = CoreIdentity::parse(&core_name)?;
            let core_name = identity.core_name();
            let snapshot_name = identity.full_shard_name();

            self.solr.trigger_backup(&core_name, &snapshot_name, run_dir).await?;
            self.solr
                .await_completion(&core_name, &snapshot_name, SnapshotKind::Backup)
                .await?;
        }

        info!("Successfully created local backup for timestamp [{}]", timestamp);
        Ok(())
    }

    /// Archives and uploads every snapshot below `run_dir` concurrently.
    async fn store_local_backup(
        &self,
        bucket: &str,
        timestamp: &BackupTimestamp,
        run_dir: &Path,
    ) -> ManagerResult<Vec<ShardSnapshot>> {
        info!("Start archiving and uploading of backup [{}] to bucket [{}]", timestamp, bucket);

        let mut tasks = JoinSet::new();
        for shard in find_snapshot_dirs(run_dir)? {
            let worker = self.worker.clone();
            let run_dir = run_dir.to_path_buf();
            let bucket = bucket.to_string();
            let timestamp = timestamp.clone();

            tasks.spawn(async move { worker.upload(&run_dir, &bucket, &timestamp, &shard).await });
        }

        let mut snapshots = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(snapshot)) => snapshots.push(snapshot),
                Ok(Err(e)) => {
                    error!("Archive upload failed: {}", e);
                    first_error = first_error.or(Some(e));
                }
                Err(e) => {
                    error!("Archive upload task aborted: {}", e);
                    first_error =
                        first_error.or_else(|| Some(ManagerError::Other(format!("upload task aborted: {}", e))));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!("Finished archiving and uploading of backup [{}]", timestamp);
        Ok(snapshots)
    }

    /// Restores the backup `timestamp` from `bucket` onto every local core.
    pub async fn restore_backup(
        &self,
        bucket: &str,
        timestamp: &BackupTimestamp,
        cleanup: bool,
    ) -> ManagerResult<RestoreReport> {
        info!(
            "Start restoring backup for timestamp [{}] from bucket [{}]",
            timestamp, bucket
        );

        let workdir = WorkingDirectory::acquire(self.root_dir(), cleanup).await?;
        let mut run = RestoreRun::default();

        let swept = self.sweep_restores(&workdir, bucket, timestamp, &mut run).await;
        run.join_all().await;
        workdir.release().await;
        swept?;

        let report = run.into_report();
        for failure in &report.failed {
            error!(
                "Restore of core [{}] failed while {:?}: {}",
                failure.core_name, failure.stage, failure.error
            );
        }
        info!(
            "Finished restoring backup for timestamp [{}] from bucket [{}]: {} restored, {} failed",
            timestamp,
            bucket,
            report.restored.len(),
            report.failed.len()
        );

        if report.failed.is_empty() {
            Ok(report)
        } else {
            Err(ManagerError::RestoreIncomplete {
                failed: report.failed.iter().map(|f| f.core_name.clone()).collect(),
            })
        }
    }

    async fn sweep_restores(
        &self,
        workdir: &WorkingDirectory,
        bucket: &str,
        timestamp: &BackupTimestamp,
        run: &mut RestoreRun,
    ) -> ManagerResult<()> {
        let run_dir = workdir.ensure_run_dir(timestamp).await?;

        for sweep in 1..=self.config.restore_sweep_count {
            run.reap_finished();
            debug!("Restore sweep {}/{}", sweep, self.config.restore_sweep_count);

            for core_name in self.solr.list_local_cores().await {
                let identity = CoreIdentity::parse(&core_name)?;
                let shard = identity.shard_ref().normalized();

                if run_dir.join(shard.snapshot_dir_name()).is_dir() {
                    debug!(
                        "Skipping shard [{}] of collection [{}] since it is already restored",
                        shard.full_name(),
                        shard.collection
                    );
                    continue;
                }
                if run.is_in_flight(&core_name) {
                    debug!("Restore of core [{}] is still running", core_name);
                    continue;
                }

                let worker = self.worker.clone();
                let root_dir = workdir.root().to_path_buf();
                let run_dir = run_dir.clone();
                let bucket = bucket.to_string();
                let timestamp = timestamp.clone();
                run.spawn(core_name.clone(), async move {
                    let outcome = worker
                        .restore(&root_dir, &run_dir, &bucket, &timestamp, &identity)
                        .await;
                    (core_name, outcome)
                });
            }

            sleep(self.config.restore_sweep_wait()).await;
        }

        Ok(())
    }
}

/// Restore tasks of one run and their collected outcomes.
#[derive(Default)]
struct RestoreRun {
    tasks: JoinSet<RestoreOutcome>,
    in_flight: HashMap<Id, String>,
    restored: HashMap<String, ShardRef>,
    failed: HashMap<String, ShardFailure>,
}

impl RestoreRun {
    fn spawn<F>(&mut self, core_name: String, task: F)
    where
        F: std::future::Future<Output = RestoreOutcome> + Send + 'static,
    {
        let handle = self.tasks.spawn(task);
        self.in_flight.insert(handle.id(), core_name);
    }

    // Keyed by core, not shard: replicas of one shard extract into the same
    // archive path of the backup root and may restore side by side.
    fn is_in_flight(&self, core_name: &str) -> bool {
        self.in_flight.values().any(|name| name == core_name)
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.tasks.try_join_next_with_id() {
            self.record(joined);
        }
    }

    async fn join_all(&mut self) {
        while let Some(joined) = self.tasks.join_next_with_id().await {
            self.record(joined);
        }
    }

    fn record(&mut self, joined: Result<(Id, RestoreOutcome), JoinError>) {
        match joined {
            Ok((id, (core_name, outcome))) => {
                self.in_flight.remove(&id);
                match outcome {
                    Ok(shard) => {
                        self.failed.remove(&core_name);
                        self.restored.insert(core_name, shard);
                    }
                    Err((stage, e)) => {
                        warn!("Restore of core [{}] failed while {:?}: {}", core_name, stage, e);
                        self.failed.insert(
                            core_name.clone(),
                            ShardFailure {
                                core_name,
                                stage,
                                error: e.to_string(),
                            },
                        );
                    }
                }
            }
            Err(e) => {
                let core_name = self
                    .in_flight
                    .remove(&e.id())
                    .unwrap_or_else(|| "unknown".to_string());
                error!("Restore task for core [{}] aborted: {}", core_name, e);
                self.failed.insert(
                    core_name.clone(),
                    ShardFailure {
                        core_name,
                        stage: RestoreStage::Downloading,
                        error: e.to_string(),
                    },
                );
            }
        }
    }

    fn into_report(self) -> RestoreReport {
        let mut restored: Vec<ShardRef> = self.restored.into_values().collect();
        restored.sort_by_key(ShardRef::full_name);
        let mut failed: Vec<ShardFailure> = self.failed.into_values().collect();
        failed.sort_by(|a, b| a.core_name.cmp(&b.core_name));
        RestoreReport { restored, failed }
    }
}

/// Resolves every `snapshot.*` directory below `run_dir` to its shard.
fn find_snapshot_dirs(run_dir: &Path) -> ManagerResult<Vec<ShardRef>> {
    let pattern = format!(
        "{}/snapshot.*",
        glob::Pattern::escape(&run_dir.to_string_lossy())
    );

    let mut shards = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| ManagerError::Other(format!("Glob pattern error: {}", e)))? {
        let path: PathBuf = entry.map_err(|e| ManagerError::Other(format!("Glob entry error: {}", e)))?;
        if !path.is_dir() {
            continue;
        }

        let dir_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ManagerError::Other(format!("Invalid snapshot directory: {}", path.display())))?;
        shards.push(ShardRef::from_snapshot_dir_name(dir_name)?);
    }

    if shards.is_empty() {
        warn!("No snapshot directories found below [{}]", run_dir.display());
    }
    Ok(shards)
}
