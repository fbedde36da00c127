use chrono::{NaiveDateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::identity::ShardRef;
use crate::constants::naming::{ARCHIVE_PREFIX, ARCHIVE_SUFFIX, TIMESTAMP_FORMAT};
use crate::errors::ConfigError;

/// `yyyyMMddHHmm` token (UTC) identifying one backup run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackupTimestamp(String);

impl BackupTimestamp {
    pub fn now() -> Self {
        Self(Utc::now().format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: "timestamp".to_string(),
            reason: format!("[{}] does not match the format <yyyyMMddHHmm>", value),
        };

        if value.len() != 12 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| invalid())?;

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackupTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BackupTimestamp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `backup_<timestamp>_<collection>[_shardN].tar.gz`
pub fn archive_file_name(timestamp: &BackupTimestamp, shard: &ShardRef) -> String {
    format!(
        "{}{}_{}{}",
        ARCHIVE_PREFIX,
        timestamp,
        shard.full_name(),
        ARCHIVE_SUFFIX
    )
}
