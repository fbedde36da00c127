use std::fmt;
use tracing::warn;

use crate::constants::naming::SNAPSHOT_DIR_PREFIX;
use crate::errors::ConfigError;

const SHARD_PREFIX: &str = "shard";
const SHARD_MARKER: &str = "_shard";
const REPLICA_MARKER: &str = "_replica";

/// Shard identifier such as `shard1`, or `shard2_1` for a shard that was split once.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardId {
    raw: String,
}

impl ShardId {
    pub fn parse(value: &str) -> Option<Self> {
        let number = value.strip_prefix(SHARD_PREFIX)?;
        let well_formed = !number.is_empty()
            && number
                .split('_')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));

        well_formed.then(|| Self {
            raw: value.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric part without the `shard` prefix, e.g. `2_1`.
    pub fn number(&self) -> &str {
        &self.raw[SHARD_PREFIX.len()..]
    }

    /// Renumbers a one-time split `shardA_B` to `shard{2*A + B - 1}`.
    ///
    /// Identifiers without a split marker are returned unchanged. Identifiers
    /// split more than once cannot be renumbered and are returned unchanged too.
    pub fn normalized(&self) -> ShardId {
        let parts: Vec<&str> = self.number().split('_').collect();
        match parts.as_slice() {
            [_] => self.clone(),
            [first, second] => {
                let renumbered = first
                    .parse::<u64>()
                    .ok()
                    .zip(second.parse::<u64>().ok())
                    .and_then(|(a, b)| a.checked_mul(2)?.checked_add(b)?.checked_sub(1));

                match renumbered {
                    Some(number) => ShardId {
                        raw: format!("{}{}", SHARD_PREFIX, number),
                    },
                    None => {
                        warn!("Cannot renumber split shard [{}], keeping it as is", self.raw);
                        self.clone()
                    }
                }
            }
            _ => {
                warn!(
                    "Shard [{}] was split more than once, only one-time splits are renumbered",
                    self.raw
                );
                self.clone()
            }
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Logical shard of a collection, shared by all of its replicas.
///
/// An unsharded (single core) deployment has no shard component.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardRef {
    pub collection: String,
    pub shard: Option<ShardId>,
}

impl ShardRef {
    /// Parses `collection_shardN[_M]` or a bare `collection`.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some((collection, shard)) = name.rsplit_once(SHARD_MARKER) {
            let shard = ShardId::parse(&format!("{}{}", SHARD_PREFIX, shard));
            if let Some(shard) = shard.filter(|_| is_collection_name(collection)) {
                return Some(Self {
                    collection: collection.to_string(),
                    shard: Some(shard),
                });
            }
        }

        is_collection_name(name).then(|| Self {
            collection: name.to_string(),
            shard: None,
        })
    }

    /// Resolves an on-disk `snapshot.<name>` directory back to its shard.
    pub fn from_snapshot_dir_name(dir_name: &str) -> Result<Self, ConfigError> {
        dir_name
            .strip_prefix(SNAPSHOT_DIR_PREFIX)
            .and_then(Self::parse)
            .ok_or_else(|| ConfigError::UnrecognizedCoreFormat {
                name: dir_name.to_string(),
            })
    }

    /// Snapshot name used by Solr: `collection[_shard]`.
    pub fn full_name(&self) -> String {
        match &self.shard {
            Some(shard) => format!("{}_{}", self.collection, shard),
            None => self.collection.clone(),
        }
    }

    pub fn normalized(&self) -> ShardRef {
        ShardRef {
            collection: self.collection.clone(),
            shard: self.shard.as_ref().map(ShardId::normalized),
        }
    }

    pub fn snapshot_dir_name(&self) -> String {
        format!("{}{}", SNAPSHOT_DIR_PREFIX, self.full_name())
    }
}

impl fmt::Display for ShardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Identity of a locally hosted core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreIdentity {
    /// `collection_shardN[_M]_replicaK`
    Sharded {
        collection: String,
        shard: ShardId,
        replica: String,
    },
    /// Bare `collection` of a single-core deployment
    Single { collection: String },
}

impl CoreIdentity {
    /// Tries the sharded shape first and falls back to the bare collection shape.
    pub fn parse(core_name: &str) -> Result<Self, ConfigError> {
        if let Some(identity) = Self::parse_sharded(core_name) {
            return Ok(identity);
        }

        if is_collection_name(core_name) {
            return Ok(CoreIdentity::Single {
                collection: core_name.to_string(),
            });
        }

        Err(ConfigError::UnrecognizedCoreFormat {
            name: core_name.to_string(),
        })
    }

    fn parse_sharded(core_name: &str) -> Option<Self> {
        let (shard_name, replica_number) = core_name.rsplit_once(REPLICA_MARKER)?;
        if replica_number.is_empty() || !replica_number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let shard_ref = ShardRef::parse(shard_name)?;
        let shard = shard_ref.shard?;

        Some(CoreIdentity::Sharded {
            collection: shard_ref.collection,
            shard,
            replica: format!("replica{}", replica_number),
        })
    }

    pub fn collection(&self) -> &str {
        match self {
            CoreIdentity::Sharded { collection, .. } | CoreIdentity::Single { collection } => {
                collection
            }
        }
    }

    pub fn shard(&self) -> Option<&ShardId> {
        match self {
            CoreIdentity::Sharded { shard, .. } => Some(shard),
            CoreIdentity::Single { .. } => None,
        }
    }

    pub fn replica(&self) -> Option<&str> {
        match self {
            CoreIdentity::Sharded { replica, .. } => Some(replica),
            CoreIdentity::Single { .. } => None,
        }
    }

    pub fn shard_ref(&self) -> ShardRef {
        ShardRef {
            collection: self.collection().to_string(),
            shard: self.shard().cloned(),
        }
    }

    /// Snapshot name shared by every replica of the shard.
    pub fn full_shard_name(&self) -> String {
        self.shard_ref().full_name()
    }

    pub fn core_name(&self) -> String {
        match self {
            CoreIdentity::Sharded {
                collection,
                shard,
                replica,
            } => format!("{}_{}_{}", collection, shard, replica),
            CoreIdentity::Single { collection } => collection.clone(),
        }
    }
}

fn is_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}
