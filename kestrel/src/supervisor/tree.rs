//! Hierarchical composition of supervisor nodes.
//!
//! A tree arranges nodes into fault-isolation domains: each node supervises
//! its own children, and a node can itself sit under a parent. When a node
//! reports a failure it cannot absorb (its restart budget for some child is
//! exhausted), the tree escalates according to that node's configured
//! policy: contain the blast radius to the subtree, or hand the failure to
//! the parent's domain.

use std::collections::HashMap;

use tracing::warn;

use kestrel_api::monitor::Monitor;

use super::child::Child;
use super::error::SupervisorError;
use super::node::SupervisorNode;
use super::types::SupervisorId;
use crate::monitor::events::SupervisionEvent;

/// What a node does with a failure its own budget cannot absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscalationPolicy {
    /// Restart this node's whole subtree in place; the parent never sees
    /// the failure.
    #[default]
    IsolateSubtree,

    /// Pass the failure up: the parent treats the subtree as a failed unit
    /// and applies its own escalation policy.
    EscalateToParent,
}

/// How an escalation was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// The subtree rooted at this node was restarted.
    SubtreeRestarted(SupervisorId),
}

struct TreeEntry<C, M>
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    node: SupervisorNode<C, M>,
    parent: Option<SupervisorId>,
    escalation: EscalationPolicy,
}

/// Tree of supervisor nodes with parent links.
pub struct SupervisorTree<C, M = kestrel_api::monitor::NoopMonitor<SupervisionEvent>>
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    nodes: HashMap<SupervisorId, TreeEntry<C, M>>,
}

impl<C, M> SupervisorTree<C, M>
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Adds a root node (no parent).
    pub fn add_root(&mut self, node: SupervisorNode<C, M>, escalation: EscalationPolicy) -> SupervisorId {
        let id = node.id();
        self.nodes.insert(
            id,
            TreeEntry {
                node,
                parent: None,
                escalation,
            },
        );
        id
    }

    /// Adds a node under an existing parent.
    pub fn add_child_supervisor(
        &mut self,
        parent: SupervisorId,
        node: SupervisorNode<C, M>,
        escalation: EscalationPolicy,
    ) -> Result<SupervisorId, SupervisorError> {
        if !self.nodes.contains_key(&parent) {
            return Err(SupervisorError::UnknownSupervisor { id: parent });
        }

        let id = node.id();
        self.nodes.insert(
            id,
            TreeEntry {
                node,
                parent: Some(parent),
                escalation,
            },
        );
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &SupervisorId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &SupervisorId) -> Option<&SupervisorNode<C, M>> {
        self.nodes.get(id).map(|entry| &entry.node)
    }

    pub fn node_mut(&mut self, id: &SupervisorId) -> Option<&mut SupervisorNode<C, M>> {
        self.nodes.get_mut(id).map(|entry| &mut entry.node)
    }

    pub fn parent(&self, id: &SupervisorId) -> Option<SupervisorId> {
        self.nodes.get(id).and_then(|entry| entry.parent)
    }

    /// Ids of the direct child supervisors of `id`.
    pub fn child_supervisors(&self, id: &SupervisorId) -> Vec<SupervisorId> {
        self.nodes
            .iter()
            .filter(|(_, entry)| entry.parent == Some(*id))
            .map(|(child_id, _)| *child_id)
            .collect()
    }

    /// Removes a node and its descendant subtree, shutting all of them down
    /// (deepest first).
    pub async fn remove_supervisor(
        &mut self,
        id: SupervisorId,
    ) -> Result<(), SupervisorError> {
        if !self.nodes.contains_key(&id) {
            return Err(SupervisorError::UnknownSupervisor { id });
        }

        let mut order = self.subtree_ids(id);
        order.reverse();
        for node_id in order {
            if let Some(mut entry) = self.nodes.remove(&node_id) {
                if let Err(err) = entry.node.shutdown().await {
                    warn!(supervisor = %node_id, error = %err, "subtree node failed to shut down cleanly");
                }
            }
        }
        Ok(())
    }

    /// Escalates a failure that exhausted `id`'s restart budget.
    ///
    /// Walks upward past every node configured to escalate, then restarts
    /// the subtree of the node that absorbs the failure. A root configured
    /// to escalate has nowhere to go and absorbs the failure itself.
    pub async fn escalate_failure(
        &mut self,
        id: SupervisorId,
    ) -> Result<EscalationOutcome, SupervisorError> {
        let mut current = id;
        loop {
            let entry = self
                .nodes
                .get(&current)
                .ok_or(SupervisorError::UnknownSupervisor { id: current })?;

            match (entry.escalation, entry.parent) {
                (EscalationPolicy::EscalateToParent, Some(parent)) => {
                    current = parent;
                }
                _ => break,
            }
        }

        self.restart_subtree(current).await?;
        Ok(EscalationOutcome::SubtreeRestarted(current))
    }

    /// Restarts every node in the subtree rooted at `id`: children are torn
    /// down deepest-first, then rebuilt from their specs top-down.
    async fn restart_subtree(&mut self, id: SupervisorId) -> Result<(), SupervisorError> {
        let order = self.subtree_ids(id);

        let mut first_error = None;
        for node_id in order {
            let entry = self.nodes.get_mut(&node_id).expect("subtree ids exist");
            if let Err(err) = entry.node.restart_all_children().await {
                warn!(supervisor = %node_id, error = %err, "subtree restart left node degraded");
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Subtree node ids, parents before children.
    fn subtree_ids(&self, root: SupervisorId) -> Vec<SupervisorId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if self.nodes.contains_key(&current) {
                order.push(current);
                stack.extend(self.child_supervisors(&current));
            }
        }
        order
    }
}

impl<C, M> Default for SupervisorTree<C, M>
where
    C: Child,
    M: Monitor<SupervisionEvent>,
{
    fn default() -> Self {
        Self::new()
    }
}
