use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::solr::{
    BACKUP_STATUS_INDEX, STATUS_IN_PROGRESS, STATUS_SUCCESS, UNKNOWN_EXCEPTION,
};
use crate::errors::{HttpError, ManagerError, RemoteOperationError};

/// Which asynchronous replication command is being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Backup,
    Restore,
}

impl SnapshotKind {
    fn trigger_command(&self) -> &'static str {
        match self {
            SnapshotKind::Backup => "backup",
            SnapshotKind::Restore => "restore",
        }
    }

    fn status_command(&self) -> &'static str {
        match self {
            SnapshotKind::Backup => "details",
            SnapshotKind::Restore => "restorestatus",
        }
    }

    /// Reads the status field from a status response, if present.
    ///
    /// Backups report their status at a fixed position of the `details.backup`
    /// array. Newer Solr releases report an object with a `status` field instead.
    fn extract_status(&self, response: &Value) -> Option<String> {
        let status = match self {
            SnapshotKind::Backup => {
                let backup = response.get("details")?.get("backup")?;
                match backup {
                    Value::Array(fields) => fields.get(BACKUP_STATUS_INDEX)?,
                    Value::Object(fields) => fields.get("status")?,
                    _ => return None,
                }
            }
            SnapshotKind::Restore => response.get("restorestatus")?.get("status")?,
        };
        status.as_str().map(str::to_string)
    }

    fn failure_reason(&self, last_response: Option<&Value>, last_status: &str) -> String {
        match self {
            SnapshotKind::Backup => format!("last reported status: {}", last_status),
            SnapshotKind::Restore => last_response
                .and_then(|r| r.get("restorestatus"))
                .and_then(|r| r.get("exception"))
                .and_then(|e| e.as_str())
                .unwrap_or(UNKNOWN_EXCEPTION)
                .to_string(),
        }
    }
}

/// Polling budget of one kind of operation.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub retry_count: u32,
    pub retry_wait: Duration,
}

/// Client for the admin, update and replication handlers of the local Solr node.
pub struct SolrClient {
    base_url: String,
    client: Client,
    backup_polling: PollPolicy,
    restore_polling: PollPolicy,
}

impl SolrClient {
    pub fn new(config: &Config) -> Result<Self, ManagerError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ManagerError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.solr_url.trim_end_matches('/').to_string(),
            client,
            backup_polling: PollPolicy {
                retry_count: config.backup_retry_count,
                retry_wait: Duration::from_secs(config.backup_retry_wait_seconds),
            },
            restore_polling: PollPolicy {
                retry_count: config.restore_retry_count,
                retry_wait: Duration::from_secs(config.restore_retry_wait_seconds),
            },
        })
    }

    fn polling(&self, kind: SnapshotKind) -> PollPolicy {
        match kind {
            SnapshotKind::Backup => self.backup_polling,
            SnapshotKind::Restore => self.restore_polling,
        }
    }

    /// Names of all cores hosted by the local node.
    ///
    /// A node that cannot be queried hosts nothing as far as the controller is
    /// concerned, so failures are logged and yield an empty list.
    pub async fn list_local_cores(&self) -> Vec<String> {
        info!("Getting locally hosted cores ...");
        let params = [("action", "STATUS"), ("wt", "json")];

        match self.get_json("admin/cores", &params).await {
            Ok(Some(response)) => {
                let cores: Vec<String> = response
                    .get("status")
                    .and_then(|s| s.as_object())
                    .map(|status| status.keys().cloned().collect())
                    .unwrap_or_default();
                info!("Locally hosted cores are: {:?}", cores);
                cores
            }
            Ok(None) => {
                warn!("Could not get locally hosted cores: request timed out");
                Vec::new()
            }
            Err(e) => {
                warn!("Could not get locally hosted cores: {}", e);
                Vec::new()
            }
        }
    }

    /// Triggers a hard commit on a collection.
    pub async fn commit(&self, collection: &str) -> Result<(), HttpError> {
        info!("Triggering hard commit for [{}] ...", collection);
        let params = [("commit", "true"), ("wt", "json")];
        self.send_command(&format!("{}/update", collection), &params).await
    }

    pub async fn trigger_backup(
        &self,
        core_name: &str,
        snapshot_name: &str,
        location: &Path,
    ) -> Result<(), HttpError> {
        info!("Creating backup for [{}] ...", snapshot_name);
        self.trigger(SnapshotKind::Backup, core_name, snapshot_name, location).await
    }

    pub async fn trigger_restore(
        &self,
        core_name: &str,
        snapshot_name: &str,
        location: &Path,
    ) -> Result<(), HttpError> {
        info!("Restoring backup for [{}] locally ...", snapshot_name);
        self.trigger(SnapshotKind::Restore, core_name, snapshot_name, location).await
    }

    async fn trigger(
        &self,
        kind: SnapshotKind,
        core_name: &str,
        snapshot_name: &str,
        location: &Path,
    ) -> Result<(), HttpError> {
        let location = location.to_string_lossy();
        let params = [
            ("command", kind.trigger_command()),
            ("wt", "json"),
            ("location", location.as_ref()),
            ("name", snapshot_name),
        ];
        self.send_command(&format!("{}/replication", core_name), &params).await
    }

    /// Polls the status of a backup or restore until it leaves `In Progress`.
    ///
    /// Every poll is followed by the configured wait. Only a response without
    /// a status field consumes an attempt; once the attempts are spent the
    /// operation counts as failed. A reported `In Progress` keeps polling.
    pub async fn await_completion(
        &self,
        core_name: &str,
        snapshot_name: &str,
        kind: SnapshotKind,
    ) -> Result<(), ManagerError> {
        let policy = self.polling(kind);
        let path = format!("{}/replication", core_name);
        let params = [("command", kind.status_command()), ("wt", "json")];

        let mut status = STATUS_IN_PROGRESS.to_string();
        let mut last_response: Option<Value> = None;
        let mut attempt = 0;

        while status == STATUS_IN_PROGRESS && attempt < policy.retry_count {
            let response = self.get_json(&path, &params).await?;
            debug!("Status response for [{}]: {:?}", snapshot_name, response);

            match response.as_ref().and_then(|r| kind.extract_status(r)) {
                Some(reported) => {
                    debug!("{:?} status for [{}]: {}", kind, snapshot_name, reported);
                    status = reported;
                }
                None => {
                    attempt += 1;
                    info!(
                        "{:?} status for [{}] could not be derived from response ... retrying (attempt {}/{})",
                        kind, snapshot_name, attempt, policy.retry_count
                    );
                }
            }
            last_response = response;

            sleep(policy.retry_wait).await;
        }

        if status == STATUS_SUCCESS {
            info!("{:?} for [{}] successful", kind, snapshot_name);
            return Ok(());
        }

        let reason = kind.failure_reason(last_response.as_ref(), &status);
        let error = match kind {
            SnapshotKind::Backup => RemoteOperationError::BackupFailed {
                shard: snapshot_name.to_string(),
                reason,
            },
            SnapshotKind::Restore => RemoteOperationError::RestoreFailed {
                shard: snapshot_name.to_string(),
                reason,
            },
        };
        Err(error.into())
    }

    /// Sends a command whose response body is not needed. A `504` is tolerated.
    async fn send_command(&self, path: &str, params: &[(&str, &str)]) -> Result<(), HttpError> {
        self.send(path, params).await.map(|_| ())
    }

    /// Sends a request and parses its JSON body. Returns `None` on a `504`.
    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Option<Value>, HttpError> {
        let url = format!("{}/{}", self.base_url, path);
        let Some(body) = self.send(path, params).await? else {
            return Ok(None);
        };

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| HttpError::InvalidResponse {
                url,
                reason: e.to_string(),
            })
    }

    async fn send(&self, path: &str, params: &[(&str, &str)]) -> Result<Option<String>, HttpError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Send HTTP GET request to [{}] with {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| HttpError::ConnectionFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await.map_err(|e| HttpError::ConnectionFailed {
                    url: url.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Some(body))
            }
            StatusCode::GATEWAY_TIMEOUT => {
                warn!("HTTP timeout from [{}], but should have been done anyways", url);
                Ok(None)
            }
            status => Err(HttpError::UnexpectedStatus {
                url,
                status: status.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backup_status_from_positional_details() {
        let response = json!({"details": {"backup": ["", "", "", "", "", "success"]}});
        assert_eq!(
            SnapshotKind::Backup.extract_status(&response).as_deref(),
            Some("success")
        );
    }

    #[test]
    fn test_backup_status_missing_when_details_short() {
        let response = json!({"details": {"backup": ["", "", "startTime"]}});
        assert_eq!(SnapshotKind::Backup.extract_status(&response), None);
        assert_eq!(SnapshotKind::Backup.extract_status(&json!({})), None);
    }

    #[test]
    fn test_backup_status_from_object_details() {
        let response = json!({"details": {"backup": {"status": "In Progress"}}});
        assert_eq!(
            SnapshotKind::Backup.extract_status(&response).as_deref(),
            Some("In Progress")
        );
    }

    #[test]
    fn test_restore_failure_reason_defaults_to_unknown() {
        let response = json!({"restorestatus": {"status": "failed"}});
        assert_eq!(
            SnapshotKind::Restore.failure_reason(Some(&response), "failed"),
            "Unknown"
        );

        let response = json!({"restorestatus": {"status": "failed", "exception": "disk full"}});
        assert_eq!(
            SnapshotKind::Restore.failure_reason(Some(&response), "failed"),
            "disk full"
        );
    }
}
