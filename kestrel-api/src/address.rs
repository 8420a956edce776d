//! # Actor Address Module
//!
//! ## Key Concepts
//! - ActorId: Globally unique actor identifier
//! - ActorAddress: Logical routing key used by the registry and bus
//!
//! ## Design Principles
//! - Immutability: Addresses never change after creation
//! - Value semantics: Equality and hashing define registry keys
//! - Thread safety: All types are Send + Sync

use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique identifier for an actor.
///
/// Backed by a UUID v4, so ids are unique without coordination and cheap to
/// copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Generates a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical address of a message recipient.
///
/// An address is one of:
/// - `Named`: a stable, human-readable name plus unique id
/// - `Anonymous`: id only, for actors nobody needs to look up by name
/// - `PoolMember`: a member of a named pool of interchangeable workers,
///   selected by the registry's pool routing strategies
///
/// Equality and hashing cover the full variant contents, so two named actors
/// with the same name but different ids are distinct registry keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorAddress {
    /// Named actor, discoverable by name.
    Named { id: ActorId, name: String },
    /// Anonymous actor, reachable only via this address value.
    Anonymous { id: ActorId },
    /// Member of a load-balanced pool.
    PoolMember {
        id: ActorId,
        pool: String,
        name: String,
    },
}

impl ActorAddress {
    /// Creates a new named address.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            id: ActorId::new(),
            name: name.into(),
        }
    }

    /// Creates a new anonymous address.
    pub fn anonymous() -> Self {
        Self::Anonymous { id: ActorId::new() }
    }

    /// Creates a new pool-member address.
    pub fn pool_member(pool: impl Into<String>, name: impl Into<String>) -> Self {
        Self::PoolMember {
            id: ActorId::new(),
            pool: pool.into(),
            name: name.into(),
        }
    }

    /// Returns the actor id.
    pub fn id(&self) -> &ActorId {
        match self {
            Self::Named { id, .. } => id,
            Self::Anonymous { id } => id,
            Self::PoolMember { id, .. } => id,
        }
    }

    /// Returns the name, if this address carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            Self::Anonymous { .. } => None,
            Self::PoolMember { name, .. } => Some(name),
        }
    }

    /// Returns the pool name for pool members.
    pub fn pool(&self) -> Option<&str> {
        match self {
            Self::PoolMember { pool, .. } => Some(pool),
            _ => None,
        }
    }
}

impl Hash for ActorAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Named { id, name } => {
                0u8.hash(state);
                id.hash(state);
                name.hash(state);
            }
            Self::Anonymous { id } => {
                1u8.hash(state);
                id.hash(state);
            }
            Self::PoolMember { id, pool, name } => {
                2u8.hash(state);
                id.hash(state);
                pool.hash(state);
                name.hash(state);
            }
        }
    }
}

impl Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { id, name } => write!(f, "{name}@{id}"),
            Self::Anonymous { id } => write!(f, "anonymous@{id}"),
            Self::PoolMember { id, pool, name } => write!(f, "{pool}:{name}@{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(addr: &ActorAddress) -> u64 {
        let mut hasher = DefaultHasher::new();
        addr.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn named_addresses_with_same_name_are_distinct() {
        let a = ActorAddress::named("worker");
        let b = ActorAddress::named("worker");
        assert_ne!(a, b);
        assert_eq!(a.name(), Some("worker"));
    }

    #[test]
    fn anonymous_address_has_no_name() {
        let addr = ActorAddress::anonymous();
        assert_eq!(addr.name(), None);
        assert_eq!(addr.pool(), None);
    }

    #[test]
    fn pool_member_exposes_pool_and_name() {
        let addr = ActorAddress::pool_member("workers", "worker-1");
        assert_eq!(addr.pool(), Some("workers"));
        assert_eq!(addr.name(), Some("worker-1"));
    }

    #[test]
    fn hash_is_stable_for_clones() {
        let addr = ActorAddress::named("stable");
        let clone = addr.clone();
        assert_eq!(hash_of(&addr), hash_of(&clone));
    }

    #[test]
    fn display_formats_variants() {
        let named = ActorAddress::named("svc");
        assert!(named.to_string().starts_with("svc@"));

        let member = ActorAddress::pool_member("workers", "w0");
        assert!(member.to_string().starts_with("workers:w0@"));
    }
}
