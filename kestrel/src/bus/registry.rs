//! Concurrent actor registry with pre-computed routing keys.
//!
//! Maps logical addresses to mailbox senders for O(1) resolution. All state
//! lives in `DashMap`s, so concurrent resolves never block each other and
//! registration only contends on the touched shard. Pool members are
//! additionally grouped by pool name for load-balanced selection.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use rand::Rng;

use kestrel_api::address::ActorAddress;
use kestrel_api::message::Message;

use super::error::BusError;
use crate::mailbox::MailboxSender;

/// Selection strategy for routing to a member of an actor pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStrategy {
    /// Sequential selection using a per-pool wrapping cursor.
    RoundRobin,
    /// Uniform random selection.
    Random,
}

/// Concurrent address registry.
///
/// Clones are cheap and share the same underlying maps, so one registry can
/// be handed to the router, supervisors, and application code alike.
pub struct ActorRegistry<M: Message> {
    /// Primary routing table: address → mailbox sender.
    routing_table: Arc<DashMap<ActorAddress, MailboxSender<M>>>,

    /// Pre-computed routing keys: hash(address) → address.
    routing_keys: Arc<DashMap<u64, ActorAddress>>,

    /// Pool membership: pool name → member addresses.
    pools: Arc<DashMap<String, Vec<ActorAddress>>>,

    /// Round-robin cursors: pool name → next index (wrapping).
    pool_cursors: Arc<DashMap<String, usize>>,
}

impl<M: Message> ActorRegistry<M> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            routing_table: Arc::new(DashMap::new()),
            routing_keys: Arc::new(DashMap::new()),
            pools: Arc::new(DashMap::new()),
            pool_cursors: Arc::new(DashMap::new()),
        }
    }

    /// Registers an actor, inserting or replacing the entry for `address`.
    ///
    /// Replacement keeps pool membership free of duplicates: a pool member
    /// re-registered under the same address stays listed once.
    pub fn register(&self, address: ActorAddress, sender: MailboxSender<M>) {
        let routing_key = Self::routing_key(&address);

        self.routing_table.insert(address.clone(), sender);
        self.routing_keys.insert(routing_key, address.clone());

        if let ActorAddress::PoolMember { ref pool, .. } = address {
            let mut members = self.pools.entry(pool.clone()).or_default();
            if !members.contains(&address) {
                members.push(address);
            }
        }
    }

    /// Removes an actor from the routing table, the routing-key cache and
    /// its pool, if any.
    pub fn unregister(&self, address: &ActorAddress) -> Result<(), BusError> {
        if self.routing_table.remove(address).is_none() {
            return Err(BusError::AddressNotFound(address.clone()));
        }

        self.routing_keys.remove(&Self::routing_key(address));

        if let ActorAddress::PoolMember { pool, .. } = address {
            if let Some(mut members) = self.pools.get_mut(pool) {
                members.retain(|member| member != address);
            }
        }

        Ok(())
    }

    /// Resolves an address to its mailbox sender.
    pub fn resolve(&self, address: &ActorAddress) -> Result<MailboxSender<M>, BusError> {
        self.routing_table
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BusError::AddressNotFound(address.clone()))
    }

    /// Resolves by pre-computed routing key, skipping the hash computation.
    pub fn resolve_by_routing_key(&self, key: u64) -> Option<MailboxSender<M>> {
        self.routing_keys.get(&key).and_then(|entry| {
            self.routing_table
                .get(entry.value())
                .map(|s| s.value().clone())
        })
    }

    /// Selects a member of the named pool.
    ///
    /// Returns `None` when the pool is unknown or currently empty. Round
    /// robin advances a monotonically wrapping per-pool cursor, so
    /// consecutive calls walk the members in registration order.
    pub fn pool_member(&self, pool: &str, strategy: PoolStrategy) -> Option<ActorAddress> {
        let members = self.pools.get(pool)?;
        if members.is_empty() {
            return None;
        }

        match strategy {
            PoolStrategy::RoundRobin => {
                let mut cursor = self.pool_cursors.entry(pool.to_string()).or_insert(0);
                let index = *cursor % members.len();
                *cursor = cursor.wrapping_add(1);
                Some(members[index].clone())
            }
            PoolStrategy::Random => {
                let index = rand::thread_rng().gen_range(0..members.len());
                Some(members[index].clone())
            }
        }
    }

    /// Computes the routing key for an address.
    pub fn routing_key(address: &ActorAddress) -> u64 {
        let mut hasher = DefaultHasher::new();
        address.hash(&mut hasher);
        hasher.finish()
    }

    /// Number of registered actors.
    pub fn len(&self) -> usize {
        self.routing_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routing_table.is_empty()
    }

    /// Number of known pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Number of members in the named pool, if it exists.
    pub fn pool_len(&self, pool: &str) -> Option<usize> {
        self.pools.get(pool).map(|members| members.len())
    }
}

impl<M: Message> Default for ActorRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Clone for ActorRegistry<M> {
    fn clone(&self) -> Self {
        Self {
            routing_table: Arc::clone(&self.routing_table),
            routing_keys: Arc::clone(&self.routing_keys),
            pools: Arc::clone(&self.pools),
            pool_cursors: Arc::clone(&self.pool_cursors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::{self, BackpressureStrategy};

    #[derive(Debug, Clone)]
    struct Job;

    impl Message for Job {
        const MESSAGE_TYPE: &'static str = "job";
    }

    // Registry bookkeeping does not care whether the channel is open, so the
    // receiver half is simply dropped.
    fn sender() -> MailboxSender<Job> {
        let (tx, _rx) = mailbox::bounded(4, BackpressureStrategy::Block);
        tx
    }

    #[test]
    fn register_and_resolve() {
        let registry = ActorRegistry::<Job>::new();
        let address = ActorAddress::named("worker");

        registry.register(address.clone(), sender());
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(&address).is_ok());
    }

    #[test]
    fn register_replaces_existing_entry() {
        let registry = ActorRegistry::<Job>::new();
        let address = ActorAddress::named("worker");

        registry.register(address.clone(), sender());
        registry.register(address.clone(), sender());

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(&address).is_ok());
    }

    #[test]
    fn unregister_removes_entry() {
        let registry = ActorRegistry::<Job>::new();
        let address = ActorAddress::anonymous();

        registry.register(address.clone(), sender());
        registry.unregister(&address).unwrap();

        assert_eq!(registry.len(), 0);
        assert!(matches!(
            registry.resolve(&address),
            Err(BusError::AddressNotFound(_))
        ));
    }

    #[test]
    fn unregister_unknown_address_errors() {
        let registry = ActorRegistry::<Job>::new();
        let result = registry.unregister(&ActorAddress::anonymous());
        assert!(matches!(result, Err(BusError::AddressNotFound(_))));
    }

    #[test]
    fn routing_key_resolution_matches_direct_lookup() {
        let registry = ActorRegistry::<Job>::new();
        let address = ActorAddress::named("cached");

        registry.register(address.clone(), sender());

        let key = ActorRegistry::<Job>::routing_key(&address);
        assert!(registry.resolve_by_routing_key(key).is_some());
    }

    #[test]
    fn pool_membership_tracked_on_register_and_unregister() {
        let registry = ActorRegistry::<Job>::new();
        let members: Vec<_> = (0..3)
            .map(|i| ActorAddress::pool_member("workers", format!("worker-{i}")))
            .collect();

        for member in &members {
            registry.register(member.clone(), sender());
        }
        assert_eq!(registry.pool_count(), 1);
        assert_eq!(registry.pool_len("workers"), Some(3));

        registry.unregister(&members[1]).unwrap();
        assert_eq!(registry.pool_len("workers"), Some(2));
    }

    #[test]
    fn round_robin_cycles_through_members() {
        let registry = ActorRegistry::<Job>::new();
        for i in 0..3 {
            registry.register(
                ActorAddress::pool_member("workers", format!("worker-{i}")),
                sender(),
            );
        }

        let first = registry.pool_member("workers", PoolStrategy::RoundRobin);
        let second = registry.pool_member("workers", PoolStrategy::RoundRobin);
        let third = registry.pool_member("workers", PoolStrategy::RoundRobin);
        let fourth = registry.pool_member("workers", PoolStrategy::RoundRobin);

        assert!(first.is_some() && second.is_some() && third.is_some());
        assert_ne!(first, second);
        // Cursor wraps back to the first member.
        assert_eq!(first, fourth);
    }

    #[test]
    fn random_selection_only_returns_registered_members() {
        let registry = ActorRegistry::<Job>::new();
        for i in 0..5 {
            registry.register(
                ActorAddress::pool_member("workers", format!("worker-{i}")),
                sender(),
            );
        }

        for _ in 0..20 {
            let member = registry
                .pool_member("workers", PoolStrategy::Random)
                .expect("pool has members");
            assert!(registry.resolve(&member).is_ok());
        }
    }

    #[test]
    fn unknown_pool_yields_none() {
        let registry = ActorRegistry::<Job>::new();
        assert!(registry
            .pool_member("nowhere", PoolStrategy::RoundRobin)
            .is_none());
    }

    #[test]
    fn clones_share_state() {
        let registry = ActorRegistry::<Job>::new();
        let address = ActorAddress::named("shared");
        registry.register(address.clone(), sender());

        let clone = registry.clone();
        assert_eq!(clone.len(), 1);
        assert!(clone.resolve(&address).is_ok());
    }

    #[test]
    fn concurrent_registration_is_safe() {
        let registry = ActorRegistry::<Job>::new();
        let other = registry.clone();

        let handle = std::thread::spawn(move || {
            for i in 0..100 {
                other.register(ActorAddress::named(format!("thread-{i}")), sender());
            }
        });

        for i in 0..100 {
            registry.register(ActorAddress::named(format!("main-{i}")), sender());
        }

        handle.join().expect("registration thread panicked");
        assert_eq!(registry.len(), 200);
    }
}
