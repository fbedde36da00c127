//! HTTP communication with the locally running Solr node
//!
//! All calls are plain `GET` requests against the core admin, update and
//! replication handlers of the local node.
//!
//! # Communication Pattern
//!
//! ```text
//! Controller → trigger (command=backup|restore) → Solr core
//!     ↓
//!  poll (command=details|restorestatus) every N seconds
//!     ↓
//!  success | failure | retries exhausted
//! ```
//!
//! Solr runs backups and restores asynchronously, so a `504` answer to a
//! trigger request is expected for large cores and only logged. The status
//! endpoint decides the outcome.

pub mod solr_client;

pub use solr_client::{PollPolicy, SnapshotKind, SolrClient};
