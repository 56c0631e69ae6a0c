//! Innovation tracking for NEAT.
//!
//! Every structural change is described by an [`InnovationKey`]: the source
//! node, the target node, and whether the connection is a fresh link or one
//! half of a node split. The [`InnovationRegistry`] hands out one number per
//! key from a monotonic counter, so genomes that independently perform the
//! same change receive the same innovation number and line up in crossover.
//!
//! The registry is an explicit object owned by an ecosystem lineage and lent
//! to genomes by reference. Allocation goes through an internal mutex, so
//! structural mutation of different genomes may run on several threads and
//! still deduplicate identical keys atomically.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::gene::NodeId;
use crate::genome::Genome;

/// The kind of structural change that created a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructuralChange {
    /// A connection added between two existing nodes.
    NewConnection,
    /// One of the two connections created when a node splits a connection.
    NodeSplit,
}

/// Key identifying a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InnovationKey {
    pub source: NodeId,
    pub target: NodeId,
    pub change: StructuralChange,
}

impl InnovationKey {
    #[must_use]
    pub const fn connection(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            change: StructuralChange::NewConnection,
        }
    }

    #[must_use]
    pub const fn split(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            change: StructuralChange::NodeSplit,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    table: HashMap<InnovationKey, u64>,
    next: u64,
}

/// Maps structural changes to innovation numbers for one lineage.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(from = "RegistrySnapshot", into = "RegistrySnapshot")]
pub struct InnovationRegistry {
    state: Mutex<RegistryState>,
}

impl InnovationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the innovation number for `key`, allocating the next counter
    /// value if the key has not been seen.
    pub fn get_or_create(&self, key: InnovationKey) -> u64 {
        let mut state = self.state.lock();
        if let Some(&innovation) = state.table.get(&key) {
            return innovation;
        }
        let innovation = state.next;
        state.next += 1;
        state.table.insert(key, innovation);
        tracing::trace!(?key, innovation, "allocated innovation");
        innovation
    }

    /// Look up a key without allocating.
    #[must_use]
    pub fn peek(&self, key: InnovationKey) -> Option<u64> {
        self.state.lock().table.get(&key).copied()
    }

    /// Forget every key and restart the counter at zero.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.table.clear();
        state.next = 0;
    }

    /// Number of distinct keys registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The value the next allocation will return.
    #[must_use]
    pub fn next_innovation(&self) -> u64 {
        self.state.lock().next
    }

    /// Adopt the connections of a genome that may come from another registry.
    ///
    /// The counter moves past the genome's highest innovation so existing
    /// numbers are never handed out again. Innovations this registry has not
    /// allocated yet are recorded under a [`StructuralChange::NewConnection`]
    /// key for their endpoints, unless that key is already known.
    pub fn register_genome(&self, genome: &Genome) {
        let mut state = self.state.lock();
        let allocated = state.next;
        for conn in genome.connections() {
            if conn.innovation >= allocated {
                state
                    .table
                    .entry(InnovationKey::connection(conn.source, conn.target))
                    .or_insert(conn.innovation);
            }
            state.next = state.next.max(conn.innovation + 1);
        }
    }
}

impl Clone for InnovationRegistry {
    fn clone(&self) -> Self {
        let state = self.state.lock();
        Self {
            state: Mutex::new(RegistryState {
                table: state.table.clone(),
                next: state.next,
            }),
        }
    }
}

/// Serialized form of a registry: JSON maps cannot use struct keys, so the
/// table is stored as a list ordered by innovation number.
#[derive(Serialize, Deserialize)]
struct RegistrySnapshot {
    next: u64,
    entries: Vec<(InnovationKey, u64)>,
}

impl From<InnovationRegistry> for RegistrySnapshot {
    fn from(registry: InnovationRegistry) -> Self {
        let state = registry.state.into_inner();
        let mut entries: Vec<_> = state.table.into_iter().collect();
        entries.sort_unstable_by_key(|&(_, innovation)| innovation);
        Self {
            next: state.next,
            entries,
        }
    }
}

impl From<RegistrySnapshot> for InnovationRegistry {
    fn from(snapshot: RegistrySnapshot) -> Self {
        let next = snapshot
            .entries
            .iter()
            .map(|&(_, innovation)| innovation + 1)
            .max()
            .unwrap_or(0)
            .max(snapshot.next);
        Self {
            state: Mutex::new(RegistryState {
                table: snapshot.entries.into_iter().collect(),
                next,
            }),
        }
    }
}
