//! Mock Solr node for testing
//!
//! Answers the core admin, update and replication handlers of a single node.
//! A backup trigger writes a small `snapshot.<name>` directory into the
//! requested location the way Solr would.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

/// A request received by the mock, reduced to path and query parameters.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub path: String,
    pub params: HashMap<String, String>,
}

impl RecordedCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// `path` plus the `command` parameter, if any
    pub fn label(&self) -> String {
        match self.param("command") {
            Some(command) => format!("{} {}", self.path, command),
            None => self.path.clone(),
        }
    }
}

pub struct MockSolrServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockSolrServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Mock the core admin STATUS listing
    pub async fn mock_cores(&self, cores: &[&str]) {
        let mut status = Map::new();
        for core in cores {
            status.insert(core.to_string(), json!({ "name": core }));
        }

        Mock::given(method("GET"))
            .and(path("/admin/cores"))
            .and(query_param("action", "STATUS"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseHeader": { "status": 0 },
                "status": Value::Object(status)
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock a successful hard commit
    pub async fn mock_commit(&self, collection: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/update", collection)))
            .and(query_param("commit", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseHeader": { "status": 0 }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock a backup trigger that writes the snapshot directory
    pub async fn mock_backup_trigger(&self, core: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "backup"))
            .respond_with(SnapshotWriter)
            .mount(&self.server)
            .await;
    }

    /// Mock the backup details with the status at its fixed position
    pub async fn mock_backup_status(&self, core: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "details": {
                    "backup": ["startTime", "2024-01-01", "fileCount", 3, "status", status]
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock the backup details with the given status, answered `times` times
    pub async fn mock_backup_status_times(&self, core: &str, status: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "details": {
                    "backup": ["startTime", "2024-01-01", "fileCount", 3, "status", status]
                }
            })))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    /// Mock a details response without any backup status, answered `times` times
    pub async fn mock_backup_status_missing(&self, core: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "details": { "indexSize": "1 KB" }
            })))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_restore_trigger(&self, core: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "restore"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "OK" })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_restore_status(&self, core: &str, status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "restorestatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "restorestatus": { "snapshotName": "snapshot", "status": status }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock a failed restore carrying an exception
    pub async fn mock_restore_failure(&self, core: &str, exception: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/{}/replication", core)))
            .and(query_param("command", "restorestatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "restorestatus": { "status": "failed", "exception": exception }
            })))
            .mount(&self.server)
            .await;
    }

    /// Every request received so far, in arrival order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .map(|request| RecordedCall {
                path: request.url.path().to_string(),
                params: request.url.query_pairs().into_owned().collect(),
            })
            .collect()
    }

    /// Labels of every request received so far, in arrival order
    pub async fn call_labels(&self) -> Vec<String> {
        self.calls().await.iter().map(RecordedCall::label).collect()
    }
}

/// Writes `<location>/snapshot.<name>/` with a fake index file and answers OK.
struct SnapshotWriter;

impl Respond for SnapshotWriter {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params: HashMap<String, String> = request.url.query_pairs().into_owned().collect();

        if let (Some(location), Some(name)) = (params.get("location"), params.get("name")) {
            let snapshot_dir = Path::new(location).join(format!("snapshot.{}", name));
            std::fs::create_dir_all(&snapshot_dir).expect("Failed to create snapshot dir");
            std::fs::write(snapshot_dir.join("segments_1"), name.as_bytes())
                .expect("Failed to write snapshot file");
        }

        ResponseTemplate::new(200).set_body_json(json!({ "status": "OK" }))
    }
}
