//! Custom error types for the backup controller
//!
//! Provides structured error handling with context for the different failure
//! scenarios of a backup or restore run.

use std::fmt;

/// Main error type for the backup controller
#[derive(Debug)]
pub enum ManagerError {
    /// Configuration-related errors, including unrecognized core names
    Config(ConfigError),

    /// The run cannot start in the current local state
    Precondition(PreconditionError),

    /// HTTP communication errors with the local Solr node
    Http(HttpError),

    /// A polled snapshot or restore never reached success
    RemoteOperation(RemoteOperationError),

    /// Compression, extraction or object storage transfer failures
    Transfer(TransferError),

    /// One or more shards could not be restored
    RestoreIncomplete { failed: Vec<String> },

    /// Other errors with context
    Other(String),
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration file
    LoadFailed { path: String, reason: String },

    /// Configuration parsing error
    ParseError { reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Core name matches neither the sharded nor the single-core shape
    UnrecognizedCoreFormat { name: String },
}

/// Precondition error variants
#[derive(Debug)]
pub enum PreconditionError {
    /// Backup root must be empty before a backup starts
    WorkingDirectoryNotEmpty { path: String },

    /// Working directory could not be inspected or created
    WorkingDirectoryUnavailable { path: String, reason: String },
}

/// HTTP communication error variants
#[derive(Debug)]
pub enum HttpError {
    /// Request could not be sent or the response body could not be read
    ConnectionFailed { url: String, reason: String },

    /// Solr answered with a status other than 200
    UnexpectedStatus { url: String, status: u16 },

    /// Response body was not the expected JSON
    InvalidResponse { url: String, reason: String },
}

/// Remote operation error variants
#[derive(Debug)]
pub enum RemoteOperationError {
    /// Backup of a shard did not reach success
    BackupFailed { shard: String, reason: String },

    /// Restore of a shard did not reach success
    RestoreFailed { shard: String, reason: String },
}

/// Transfer error variants
#[derive(Debug)]
pub enum TransferError {
    /// Creating the archive failed after all attempts
    CompressionFailed { archive: String, attempts: u32, reason: String },

    /// Unpacking the archive failed
    ExtractionFailed { archive: String, reason: String },

    /// Copying the archive to the bucket failed after all attempts
    UploadFailed { archive: String, attempts: u32, reason: String },

    /// Copying the archive from the bucket failed after all attempts
    DownloadFailed { archive: String, attempts: u32, reason: String },

    /// Local filesystem manipulation failed
    Filesystem { path: String, reason: String },
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::Config(e) => write!(f, "Configuration error: {}", e),
            ManagerError::Precondition(e) => write!(f, "Precondition failed: {}", e),
            ManagerError::Http(e) => write!(f, "HTTP error: {}", e),
            ManagerError::RemoteOperation(e) => write!(f, "Remote operation error: {}", e),
            ManagerError::Transfer(e) => write!(f, "Transfer error: {}", e),
            ManagerError::RestoreIncomplete { failed } => {
                write!(f, "Restore incomplete, failed shards: [{}]", failed.join(", "))
            }
            ManagerError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::ParseError { reason } => {
                write!(f, "Failed to parse config: {}", reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::UnrecognizedCoreFormat { name } => {
                write!(f, "Unknown core name format [{}]", name)
            }
        }
    }
}

impl fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionError::WorkingDirectoryNotEmpty { path } => {
                write!(f, "Backup root directory [{}] is not empty", path)
            }
            PreconditionError::WorkingDirectoryUnavailable { path, reason } => {
                write!(f, "Working directory [{}] unavailable: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::ConnectionFailed { url, reason } => {
                write!(f, "Failed sending request to Solr [{}]: {}", url, reason)
            }
            HttpError::UnexpectedStatus { url, status } => {
                write!(f, "Received unexpected status code {} from Solr [{}]", status, url)
            }
            HttpError::InvalidResponse { url, reason } => {
                write!(f, "Invalid response from Solr [{}]: {}", url, reason)
            }
        }
    }
}

impl fmt::Display for RemoteOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOperationError::BackupFailed { shard, reason } => {
                write!(f, "Error while creating backup for [{}]: [{}]", shard, reason)
            }
            RemoteOperationError::RestoreFailed { shard, reason } => {
                write!(f, "Error while restoring backup for [{}] locally: [{}]", shard, reason)
            }
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::CompressionFailed { archive, attempts, reason } => {
                write!(f, "Creating archive [{}] failed after {} attempts: {}", archive, attempts, reason)
            }
            TransferError::ExtractionFailed { archive, reason } => {
                write!(f, "Extracting archive [{}] failed: {}", archive, reason)
            }
            TransferError::UploadFailed { archive, attempts, reason } => {
                write!(f, "Uploading [{}] failed after {} attempts: {}", archive, attempts, reason)
            }
            TransferError::DownloadFailed { archive, attempts, reason } => {
                write!(f, "Downloading [{}] failed after {} attempts: {}", archive, attempts, reason)
            }
            TransferError::Filesystem { path, reason } => {
                write!(f, "Filesystem operation on [{}] failed: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ManagerError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for PreconditionError {}
impl std::error::Error for HttpError {}
impl std::error::Error for RemoteOperationError {}
impl std::error::Error for TransferError {}

impl From<anyhow::Error> for ManagerError {
    fn from(err: anyhow::Error) -> Self {
        ManagerError::Other(err.to_string())
    }
}

impl From<ConfigError> for ManagerError {
    fn from(err: ConfigError) -> Self {
        ManagerError::Config(err)
    }
}

impl From<PreconditionError> for ManagerError {
    fn from(err: PreconditionError) -> Self {
        ManagerError::Precondition(err)
    }
}

impl From<HttpError> for ManagerError {
    fn from(err: HttpError) -> Self {
        ManagerError::Http(err)
    }
}

impl From<RemoteOperationError> for ManagerError {
    fn from(err: RemoteOperationError) -> Self {
        ManagerError::RemoteOperation(err)
    }
}

impl From<TransferError> for ManagerError {
    fn from(err: TransferError) -> Self {
        ManagerError::Transfer(err)
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
