//! Core and shard naming
//!
//! Solr names every locally hosted core either `collection_shardN_replicaM`
//! (SolrCloud) or just `collection` (single core deployment). Snapshots are
//! named after the logical shard, so all replicas of a shard share one
//! snapshot, archive and restore name.
//!
//! A shard that was split once carries two numbers (`shard2_1`). Before
//! archiving it is renumbered to a single canonical number so that the
//! snapshot directory, the archive and the later restore lookup agree.

pub mod identity;
pub mod naming;

pub use identity::{CoreIdentity, ShardId, ShardRef};
pub use naming::{archive_file_name, BackupTimestamp};
