//! Gene types for NEAT genomes.
//!
//! - [`NodeGene`]: a neuron, identified by an integer id local to its genome
//! - [`ConnectionGene`]: a weighted link, identified by its innovation number

use serde::{Deserialize, Serialize};

use crate::activation::Activation;

/// Identifier of a node within a genome.
///
/// Inputs occupy `0..I`, outputs `I..I+O`, hidden nodes follow in creation
/// order. Ids are never reclaimed or renumbered.
pub type NodeId = usize;

/// The role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Receives external values, no activation applied.
    Input,
    /// Produces network output.
    Output,
    /// Internal node added by splitting a connection.
    Hidden,
}

/// A node gene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Transfer function applied to this node's weighted input sum.
    pub activation: Activation,
}

impl NodeGene {
    #[must_use]
    pub fn input(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Input,
            activation: Activation::Identity,
        }
    }

    #[must_use]
    pub fn output(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Output,
            activation: Activation::default(),
        }
    }

    #[must_use]
    pub fn hidden(id: NodeId, activation: Activation) -> Self {
        Self {
            id,
            kind: NodeKind::Hidden,
            activation,
        }
    }
}

/// A connection gene representing a weighted link between two nodes.
///
/// The innovation number is the gene's identity across every genome that
/// shares one [`InnovationRegistry`](crate::InnovationRegistry); crossover
/// aligns parents on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    pub innovation: u64,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f32,
    /// Disabled connections are skipped during evaluation but kept for crossover.
    pub enabled: bool,
}

impl ConnectionGene {
    /// Create a new enabled connection.
    #[must_use]
    pub fn new(innovation: u64, source: NodeId, target: NodeId, weight: f32) -> Self {
        Self {
            innovation,
            source,
            target,
            weight,
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_gene_creation() {
        let input = NodeGene::input(0);
        assert_eq!(input.kind, NodeKind::Input);
        assert_eq!(input.activation, Activation::Identity);

        let output = NodeGene::output(1);
        assert_eq!(output.kind, NodeKind::Output);
        assert_eq!(output.activation, Activation::ModifiedSigmoid);

        let hidden = NodeGene::hidden(2, Activation::Tanh);
        assert_eq!(hidden.kind, NodeKind::Hidden);
        assert_eq!(hidden.id, 2);
    }

    #[test]
    fn test_connection_gene_creation() {
        let conn = ConnectionGene::new(7, 0, 2, 0.5);
        assert_eq!(conn.source, 0);
        assert_eq!(conn.target, 2);
        assert!((conn.weight - 0.5).abs() < 1e-6);
        assert!(conn.enabled);
    }
}
