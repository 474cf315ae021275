//! Server selection subsystem.
//!
//! # Data Flow
//! ```text
//! Discovery snapshot (address -> metadata)
//!     → metadata.rs (parse key=value pairs)
//!     → strategy rebuilds its table:
//!         - consistent_hash.rs (hash ring, lock-free swap)
//!         - weighted_round_robin.rs (static weights)
//!         - latency.rs (weights derived from latency)
//!         - round_robin.rs / random.rs / closest.rs
//!     → table published atomically
//!
//! Request path (many threads):
//!     select(ctx, service_path, service_method, args)
//!     → read current table
//!     → Return: one server address, or None when the set is empty
//! ```
//!
//! # Design Decisions
//! - Every strategy implements the same `Selector` contract
//! - Updates replace state wholesale; no incremental diffing
//! - Only smooth weighted sequencing takes a lock, scoped to one pick
//! - Malformed metadata degrades to defaults, never to errors

pub mod closest;
pub mod consistent_hash;
pub mod context;
pub mod error;
pub mod hash;
pub mod latency;
pub mod metadata;
pub mod random;
pub mod round_robin;
pub mod weighted;
pub mod weighted_round_robin;

mod instrumented;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use closest::{ClosestSelector, GeoPoint};
pub use consistent_hash::{
    ConsistentHashSelector, HashRing, DEFAULT_VIRTUAL_NODES, MAX_VIRTUAL_NODES,
};
pub use context::CallContext;
pub use error::SelectorError;
pub use hash::{KeyPolicy, RequestKey};
pub use latency::{compute_latency_weights, WeightedLatencySelector};
pub use metadata::{filter_servers, Metadata, DEFAULT_WEIGHT};
pub use random::RandomSelector;
pub use round_robin::RoundRobinSelector;
pub use weighted::Weighted;
pub use weighted_round_robin::WeightedRoundRobinSelector;

/// Picks one backend address per call.
///
/// Implementations must tolerate `select` and `update_server` being called
/// concurrently from any number of threads. A `select` racing an update
/// observes either the old or the new server set, never a mixture.
pub trait Selector: Send + Sync + fmt::Debug {
    /// Choose a server for this call, or `None` when no server is known.
    fn select(
        &self,
        ctx: &CallContext,
        service_path: &str,
        service_method: &str,
        args: Option<&[u8]>,
    ) -> Option<String>;

    /// Replace the candidate set with `servers` (address -> metadata).
    fn update_server(&self, servers: &HashMap<String, String>);

    /// Strategy name, used for logs and metric labels.
    fn name(&self) -> &'static str;

    /// Number of servers in the current candidate set.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Available selection strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    Random,
    RoundRobin,
    #[default]
    WeightedRoundRobin,
    WeightedLatency,
    ConsistentHash,
    Closest,
}

impl SelectMode {
    pub const ALL: [SelectMode; 6] = [
        SelectMode::Random,
        SelectMode::RoundRobin,
        SelectMode::WeightedRoundRobin,
        SelectMode::WeightedLatency,
        SelectMode::ConsistentHash,
        SelectMode::Closest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SelectMode::Random => "random",
            SelectMode::RoundRobin => "round_robin",
            SelectMode::WeightedRoundRobin => "weighted_round_robin",
            SelectMode::WeightedLatency => "weighted_latency",
            SelectMode::ConsistentHash => "consistent_hash",
            SelectMode::Closest => "closest",
        }
    }
}

impl fmt::Display for SelectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectMode {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        SelectMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| SelectorError::UnknownMode(s.to_string()))
    }
}

/// Strategy-specific construction options.
#[derive(Debug, Clone)]
pub struct SelectorOptions {
    /// Virtual ring points per server (consistent hash).
    pub virtual_nodes: usize,
    /// Request key derivation (consistent hash).
    pub key: RequestKey,
    /// Client location (closest). Defaults to (0, 0) when absent.
    pub origin: Option<GeoPoint>,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            key: RequestKey::default(),
            origin: None,
        }
    }
}

/// Build the selector for `mode`, seeded with `servers`.
///
/// The returned selector records selection metrics and update events.
pub fn new_selector(
    mode: SelectMode,
    servers: &HashMap<String, String>,
    options: &SelectorOptions,
) -> Box<dyn Selector> {
    let inner: Box<dyn Selector> = match mode {
        SelectMode::Random => Box::new(RandomSelector::new(servers)),
        SelectMode::RoundRobin => Box::new(RoundRobinSelector::new(servers)),
        SelectMode::WeightedRoundRobin => Box::new(WeightedRoundRobinSelector::new(servers)),
        SelectMode::WeightedLatency => Box::new(WeightedLatencySelector::new(servers)),
        SelectMode::ConsistentHash => Box::new(ConsistentHashSelector::new(
            servers,
            options.virtual_nodes,
            options.key.clone(),
        )),
        SelectMode::Closest => Box::new(ClosestSelector::new(
            servers,
            options.origin.unwrap_or(GeoPoint::new(0.0, 0.0)),
        )),
    };

    tracing::info!(mode = %mode, servers = servers.len(), "Selector created");
    Box::new(instrumented::Instrumented::new(inner))
}
