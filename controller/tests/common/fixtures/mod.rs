//! This module provides reusable test utilities:
//! - Mock Solr node (core admin, update and replication handlers)
//! - Test environment builder (config, backup root, local bucket)
//! - Archive helpers

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_solr;
pub mod test_config;

pub use mock_solr::{MockSolrServer, RecordedCall};
pub use test_config::{list_dir, TestConfigBuilder, TestEnv, BUCKET};
