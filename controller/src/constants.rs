//! Central repository for default values, naming conventions and schedules
//!
//! This module organizes constants by category so that the configuration
//! layer, the controller and the scheduler share a single source of truth.

/// Default configuration values
pub mod defaults {
    /// Base URL of the locally running Solr node
    pub const SOLR_URL: &str = "http://localhost:8983/solr";

    /// Working directory shared by all shards of a run
    pub const BACKUP_ROOT_DIR: &str = "/data/backup";

    /// Wait after the hard commits before any snapshot is taken
    pub const COMMIT_WAIT_SECONDS: u64 = 120;

    /// Polling budget for backup status
    pub const BACKUP_RETRY_COUNT: u32 = 30;
    pub const BACKUP_RETRY_WAIT_SECONDS: u64 = 5;

    /// Polling budget for restore status
    pub const RESTORE_RETRY_COUNT: u32 = 30;
    pub const RESTORE_RETRY_WAIT_SECONDS: u64 = 5;

    /// Restore sweep loop
    pub const RESTORE_SWEEP_COUNT: u32 = 30;
    pub const RESTORE_SWEEP_WAIT_SECONDS: u64 = 60;

    /// Compression, upload and download attempts per shard
    pub const TRANSFER_RETRY_COUNT: u32 = 30;
    pub const TRANSFER_RETRY_WAIT_SECONDS: u64 = 5;

    /// Timeout for a single HTTP request against Solr
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Executable used by the aws storage backend
    pub const AWS_CLI: &str = "aws";
}

/// Solr replication API values
pub mod solr {
    /// Status literal reported by Solr once a backup or restore finished
    pub const STATUS_SUCCESS: &str = "success";

    /// Status literal reported while a backup or restore is running
    pub const STATUS_IN_PROGRESS: &str = "In Progress";

    /// Position of the status inside the `details.backup` array
    pub const BACKUP_STATUS_INDEX: usize = 5;

    /// Reason reported when a failed restore carries no exception
    pub const UNKNOWN_EXCEPTION: &str = "Unknown";
}

/// File and directory naming conventions
pub mod naming {
    /// Prefix of the snapshot directories written by Solr
    pub const SNAPSHOT_DIR_PREFIX: &str = "snapshot.";

    /// Prefix and suffix of the per-shard archives
    pub const ARCHIVE_PREFIX: &str = "backup_";
    pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

    /// Timestamp token identifying a run (UTC)
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";
}

/// Cron schedules in 6-field format (sec min hour day month dow), UTC
pub mod schedules {
    pub const HOURLY: &str = "0 0 * * * *";
    pub const DAILY: &str = "0 0 1 * * *";
    pub const WEEKLY: &str = "0 0 1 * * Sun";
    pub const TEST: &str = "0 * * * * *";
}
