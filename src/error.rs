//! Error types shared by genomes and the ecosystem.

use crate::gene::NodeId;

/// Result alias used throughout the crate.
pub type NeatResult<T> = Result<T, NeatError>;

/// Why a requested connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRejection {
    /// One of the endpoints is not a node of this genome.
    UnknownNode,
    /// Source and target are the same node.
    SelfLoop,
    /// An enabled connection between the two nodes already exists.
    AlreadyConnected,
    /// Output nodes cannot feed other nodes.
    SourceIsOutput,
    /// Input nodes cannot receive connections.
    TargetIsInput,
    /// The registry returned an innovation this genome already uses for a
    /// different pair of nodes, which happens when a genome built against one
    /// registry is mutated against another.
    InnovationConflict,
}

impl std::fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::UnknownNode => "unknown node",
            Self::SelfLoop => "self-connections are not permitted",
            Self::AlreadyConnected => "an enabled connection already exists",
            Self::SourceIsOutput => "source is an output node",
            Self::TargetIsInput => "target is an input node",
            Self::InnovationConflict => "innovation number already names another connection",
        };
        f.write_str(reason)
    }
}

/// Errors raised by genome and ecosystem operations.
///
/// Every variant describes a caller error. Nothing here is retried, and
/// randomized mutations never produce one: they degrade to a no-op instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NeatError {
    #[error("input dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("invalid connection {from} -> {to}: {reason}")]
    InvalidConnection {
        from: NodeId,
        to: NodeId,
        reason: ConnectionRejection,
    },

    #[error("invalid node {node}: {reason}")]
    InvalidNode { node: NodeId, reason: &'static str },

    #[error("invalid mutation on connection {innovation}: {reason}")]
    InvalidMutation {
        innovation: u64,
        reason: &'static str,
    },

    #[error("incompatible genomes: shape {expected:?} vs {actual:?}")]
    IncompatibleGenome {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}
