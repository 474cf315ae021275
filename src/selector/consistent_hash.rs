//! Consistent hash selection.
//!
//! # Responsibilities
//! - Build a hash ring with virtual nodes from the server address set
//! - Map a request-derived key to the ring successor's owner
//!
//! # Design Decisions
//! - Ring is immutable once built; updates build a new ring and swap it in
//! - Readers never lock (`ArcSwap`)
//! - No cursor state: a fixed ring and key always give the same server

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::selector::context::CallContext;
use crate::selector::hash::{hash_bytes, RequestKey};
use crate::selector::Selector;

/// Virtual points each server contributes to the ring by default.
pub const DEFAULT_VIRTUAL_NODES: usize = 160;

/// Upper bound on virtual points per server.
pub const MAX_VIRTUAL_NODES: usize = 65_536;

/// Immutable hash ring.
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    /// (point, index into `members`), sorted by point.
    points: Vec<(u64, usize)>,
    members: Vec<String>,
}

impl HashRing {
    /// Build a ring where every member owns `virtual_nodes` points.
    pub fn new<I, S>(members: I, virtual_nodes: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members: Vec<String> = members.into_iter().map(Into::into).collect();
        members.sort_unstable();
        members.dedup();

        let virtual_nodes = virtual_nodes.clamp(1, MAX_VIRTUAL_NODES);
        let mut points = Vec::with_capacity(members.len() * virtual_nodes);
        for (idx, member) in members.iter().enumerate() {
            for replica in 0..virtual_nodes {
                let label = format!("{member}#{replica}");
                points.push((hash_bytes(label.as_bytes()), idx));
            }
        }
        points.sort_unstable();

        Self { points, members }
    }

    /// Owner of the first point at or after `key`, wrapping around.
    pub fn get(&self, key: u64) -> Option<&str> {
        if self.points.is_empty() {
            return None;
        }
        let pos = self.points.partition_point(|(point, _)| *point < key);
        let (_, idx) = self.points[pos % self.points.len()];
        Some(self.members[idx].as_str())
    }

    /// Distinct ring members, sorted.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// Routes requests with the same key to the same server while it stays a member.
#[derive(Debug)]
pub struct ConsistentHashSelector {
    ring: ArcSwap<HashRing>,
    virtual_nodes: usize,
    key: RequestKey,
}

impl ConsistentHashSelector {
    pub fn new(servers: &HashMap<String, String>, virtual_nodes: usize, key: RequestKey) -> Self {
        let virtual_nodes = virtual_nodes.clamp(1, MAX_VIRTUAL_NODES);
        let ring = HashRing::new(servers.keys().cloned(), virtual_nodes);
        Self {
            ring: ArcSwap::from_pointee(ring),
            virtual_nodes,
            key,
        }
    }

    /// Current ring. Holding the returned handle keeps that ring alive across updates.
    pub fn ring(&self) -> Arc<HashRing> {
        self.ring.load_full()
    }
}

impl Selector for ConsistentHashSelector {
    fn select(
        &self,
        _ctx: &CallContext,
        service_path: &str,
        service_method: &str,
        args: Option<&[u8]>,
    ) -> Option<String> {
        let key = self.key.derive(service_path, service_method, args);
        self.ring.load().get(key).map(str::to_owned)
    }

    fn update_server(&self, servers: &HashMap<String, String>) {
        let ring = HashRing::new(servers.keys().cloned(), self.virtual_nodes);
        tracing::debug!(
            members = ring.len(),
            points = ring.point_count(),
            "Rebuilt consistent hash ring"
        );
        self.ring.store(Arc::new(ring));
    }

    fn name(&self) -> &'static str {
        "consistent_hash"
    }

    fn len(&self) -> usize {
        self.ring.load().len()
    }
}
