//! Mount registry contract shared by every mounting strategy

use crate::tree::{NodeId, TreeError};
use crate::view::Element;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque identifier of one mounted instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceKey(String);

impl InstanceKey {
    /// Draw a fresh random key, rendered in base 36
    pub fn generate() -> Self {
        let mut value: u64 = rand::thread_rng().gen();
        let mut digits = Vec::with_capacity(13);
        loop {
            let digit = (value % 36) as u32;
            digits.push(std::char::from_digit(digit, 36).unwrap_or('0'));
            value /= 36;
            if value == 0 {
                break;
            }
        }
        Self(digits.into_iter().rev().collect())
    }

    /// Draw keys until one is not in `live`
    pub fn generate_unique(live: &HashSet<InstanceKey>) -> Self {
        loop {
            let key = Self::generate();
            if !live.contains(&key) {
                return key;
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstanceKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Errors raised while mounting an instance
#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("mount target {0} does not exist")]
    TargetNotFound(NodeId),

    #[error("render tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("component '{name}' failed to instantiate: {source}")]
    Component {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("mount point is no longer alive")]
    MountPointDropped,
}

/// A strategy for materializing and destroying UI instances by key
///
/// `mount` must leave no residue when it fails. `unmount` is idempotent,
/// removes the registry entry before touching any resource and never fails:
/// release errors are logged and swallowed.
pub trait Mounter: Send + Sync {
    /// Instantiate `element`, optionally under `target`, and return its key
    fn mount(&self, element: Element, target: Option<NodeId>) -> Result<InstanceKey, MountError>;

    /// Remove the instance tracked under `key`, if any
    fn unmount(&self, key: &InstanceKey);

    fn is_mounted(&self, key: &InstanceKey) -> bool;

    /// Number of live instances
    fn mounted_count(&self) -> usize;
}
