//! Test environment builder
//!
//! Every environment gets its own backup root and a local directory standing
//! in for the bucket store. All waits default to zero.

use solrcloud_backup::archive::compress_directory;
use solrcloud_backup::{BackupTimestamp, Config, StorageBackend, StorageConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const BUCKET: &str = "solr-backups";

pub struct TestConfigBuilder {
    config: Config,
}

impl TestConfigBuilder {
    pub fn new(solr_url: &str) -> Self {
        let config = Config {
            solr_url: solr_url.to_string(),
            commit_wait_seconds: 0,
            backup_retry_count: 3,
            backup_retry_wait_seconds: 0,
            restore_retry_count: 3,
            restore_retry_wait_seconds: 0,
            restore_sweep_count: 3,
            restore_sweep_wait_seconds: 0,
            transfer_retry_count: 2,
            transfer_retry_wait_seconds: 0,
            request_timeout_seconds: 5,
            ..Config::default()
        };
        Self { config }
    }

    pub fn backup_retry_count(mut self, count: u32) -> Self {
        self.config.backup_retry_count = count;
        self
    }

    pub fn restore_sweep_count(mut self, count: u32) -> Self {
        self.config.restore_sweep_count = count;
        self
    }

    pub fn transfer_retry_count(mut self, count: u32) -> Self {
        self.config.transfer_retry_count = count;
        self
    }

    pub fn build(self) -> TestEnv {
        let backup_root = TempDir::new().expect("Failed to create backup root");
        let bucket_root = TempDir::new().expect("Failed to create bucket root");

        let mut config = self.config;
        config.backup_root_dir = backup_root.path().to_path_buf();
        config.storage = StorageConfig {
            backend: StorageBackend::Local,
            local_root: Some(bucket_root.path().to_path_buf()),
            ..StorageConfig::default()
        };

        TestEnv {
            config: Arc::new(config),
            backup_root,
            bucket_root,
        }
    }
}

pub struct TestEnv {
    pub config: Arc<Config>,
    pub backup_root: TempDir,
    pub bucket_root: TempDir,
}

impl TestEnv {
    pub fn backup_root(&self) -> &Path {
        self.backup_root.path()
    }

    /// `<bucket>/<timestamp>` inside the local bucket store
    pub fn bucket_dir(&self, timestamp: &BackupTimestamp) -> PathBuf {
        self.bucket_root.path().join(BUCKET).join(timestamp.as_str())
    }

    pub fn run_dir(&self, timestamp: &BackupTimestamp) -> PathBuf {
        self.backup_root().join(timestamp.as_str())
    }

    pub fn backup_root_entries(&self) -> Vec<String> {
        list_dir(self.backup_root())
    }

    /// Builds `backup_<ts>_<shard>.tar.gz` holding `snapshot.<shard>` inside `target_dir`.
    pub async fn write_archive(&self, target_dir: &Path, timestamp: &BackupTimestamp, shard: &str) -> PathBuf {
        let staging = TempDir::new().expect("Failed to create staging dir");
        let snapshot_dir_name = format!("snapshot.{}", shard);
        let snapshot_dir = staging.path().join(&snapshot_dir_name);
        fs::create_dir_all(&snapshot_dir).expect("Failed to create snapshot dir");
        fs::write(snapshot_dir.join("segments_1"), shard.as_bytes()).expect("Failed to write index");

        fs::create_dir_all(target_dir).expect("Failed to create archive dir");
        let archive = target_dir.join(format!("backup_{}_{}.tar.gz", timestamp, shard));
        compress_directory(&archive, staging.path(), &snapshot_dir_name)
            .await
            .expect("Failed to build archive");
        archive
    }

    /// Uploads an archive for `shard` into the local bucket store.
    pub async fn seed_bucket(&self, timestamp: &BackupTimestamp, shard: &str) -> PathBuf {
        let bucket_dir = self.bucket_dir(timestamp);
        self.write_archive(&bucket_dir, timestamp, shard).await
    }
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.expect("Failed to read entry").file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
