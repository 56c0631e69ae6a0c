//! NEAT genome: an arena of integer-identified nodes plus innovation-keyed
//! connections.
//!
//! Nodes live in a vector ordered by id. Ids are handed out from a counter
//! that never decreases, so a node id is never reclaimed or renumbered, even
//! across crossover. Connections are keyed by innovation number, which gives
//! crossover its alignment and evaluation a deterministic summation order.
//!
//! Structural mutations take the lineage's [`InnovationRegistry`] by
//! reference; randomized operators take an explicit `Rng` so runs are
//! reproducible from a seed.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::config::NeatConfig;
use crate::error::{ConnectionRejection, NeatError, NeatResult};
use crate::evaluator::CompiledNetwork;
use crate::gene::{ConnectionGene, NodeGene, NodeId, NodeKind};
use crate::innovation::{InnovationKey, InnovationRegistry};

/// Half-width of the range for initial and replacement weights.
pub const WEIGHT_RANGE: f32 = 1.0;

/// Weights are clamped to `[-WEIGHT_LIMIT, WEIGHT_LIMIT]` after mutation.
pub const WEIGHT_LIMIT: f32 = WEIGHT_RANGE * 10.0;

/// Draw a weight uniformly from `[-WEIGHT_RANGE, WEIGHT_RANGE]`.
pub fn random_weight<R: Rng>(rng: &mut R) -> f32 {
    rng.random::<f32>() * 2.0 * WEIGHT_RANGE - WEIGHT_RANGE
}

/// A NEAT genome representing a neural network topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    /// Node arena, ordered by id.
    nodes: Vec<NodeGene>,
    /// Connections keyed by innovation number.
    connections: BTreeMap<u64, ConnectionGene>,
    input_size: usize,
    output_size: usize,
    /// Id the next hidden node will receive.
    next_node_id: NodeId,
    /// Externally assigned score; only the ecosystem reads it.
    pub fitness: f32,
    /// Node values from the last evaluation, parallel to `nodes`.
    #[serde(skip)]
    state: Vec<f32>,
}

impl Genome {
    /// Create a genome with `input_size` inputs, `output_size` outputs and no connections.
    #[must_use]
    pub fn new(input_size: usize, output_size: usize) -> Self {
        let io = input_size + output_size;
        let mut nodes = Vec::with_capacity(io);
        nodes.extend((0..input_size).map(NodeGene::input));
        nodes.extend((input_size..io).map(NodeGene::output));

        Self {
            nodes,
            connections: BTreeMap::new(),
            input_size,
            output_size,
            next_node_id: io,
            fitness: 0.0,
            state: Vec::new(),
        }
    }

    #[must_use]
    pub const fn input_size(&self) -> usize {
        self.input_size
    }

    #[must_use]
    pub const fn output_size(&self) -> usize {
        self.output_size
    }

    /// `(input_size, output_size)`.
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.input_size, self.output_size)
    }

    /// All nodes in id order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeGene] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.node_index(id).map(|idx| &self.nodes[idx])
    }

    /// Position of a node in [`nodes`](Self::nodes).
    #[must_use]
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.binary_search_by_key(&id, |n| n.id).ok()
    }

    /// Ids of all hidden nodes, in creation order.
    #[must_use]
    pub fn hidden_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Hidden)
            .map(|n| n.id)
            .collect()
    }

    /// The id the next split will assign.
    #[must_use]
    pub const fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    /// All connections in innovation order.
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionGene> + '_ {
        self.connections.values()
    }

    #[must_use]
    pub fn connection(&self, innovation: u64) -> Option<&ConnectionGene> {
        self.connections.get(&innovation)
    }

    #[must_use]
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn num_enabled_connections(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    /// Whether an enabled connection from `source` to `target` exists.
    #[must_use]
    pub fn has_enabled_connection(&self, source: NodeId, target: NodeId) -> bool {
        self.connections
            .values()
            .any(|c| c.enabled && c.source == source && c.target == target)
    }

    /// Run one evaluation pass and return the output activations in id order.
    ///
    /// Values of nodes not yet computed in this pass are taken from the
    /// previous call (zero on the first), so recurrent connections act with a
    /// one-step delay. See [`crate::evaluator`] for details.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Dimension`] unless `inputs.len() == input_size`.
    pub fn evaluate(&mut self, inputs: &[f32]) -> NeatResult<Vec<f32>> {
        if inputs.len() != self.input_size {
            return Err(NeatError::Dimension {
                expected: self.input_size,
                actual: inputs.len(),
            });
        }
        let network = CompiledNetwork::compile(self);
        let mut outputs = vec![0.0; self.output_size];
        network.step(&mut self.state, inputs, &mut outputs)?;
        Ok(outputs)
    }

    /// Forget all values carried over from previous evaluations.
    pub fn reset_state(&mut self) {
        self.state.clear();
    }

    /// Set the activation function of a hidden or output node.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidNode`] for unknown ids and input nodes.
    pub fn set_activation(&mut self, id: NodeId, activation: Activation) -> NeatResult<()> {
        let idx = self.node_index(id).ok_or(NeatError::InvalidNode {
            node: id,
            reason: "unknown node",
        })?;
        let node = &mut self.nodes[idx];
        if node.kind == NodeKind::Input {
            return Err(NeatError::InvalidNode {
                node: id,
                reason: "input nodes have no activation",
            });
        }
        node.activation = activation;
        Ok(())
    }

    fn check_connection(&self, source: NodeId, target: NodeId) -> Result<(), ConnectionRejection> {
        let (Some(src), Some(tgt)) = (self.node(source), self.node(target)) else {
            return Err(ConnectionRejection::UnknownNode);
        };
        if source == target {
            return Err(ConnectionRejection::SelfLoop);
        }
        if self.has_enabled_connection(source, target) {
            return Err(ConnectionRejection::AlreadyConnected);
        }
        if src.kind == NodeKind::Output {
            return Err(ConnectionRejection::SourceIsOutput);
        }
        if tgt.kind == NodeKind::Input {
            return Err(ConnectionRejection::TargetIsInput);
        }
        Ok(())
    }

    /// Add a connection from `source` to `target` and return its innovation number.
    ///
    /// If the genome already holds the registry's innovation for this pair in
    /// disabled form, that gene is re-enabled with the new weight instead of
    /// being duplicated.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidConnection`] if either id is unknown, the
    /// ids are equal, an enabled connection already joins them, the source is
    /// an output, or the target is an input.
    pub fn add_connection(
        &mut self,
        registry: &InnovationRegistry,
        source: NodeId,
        target: NodeId,
        weight: f32,
    ) -> NeatResult<u64> {
        let reject = |reason| NeatError::InvalidConnection {
            from: source,
            to: target,
            reason,
        };
        self.check_connection(source, target).map_err(reject)?;

        let innovation = registry.get_or_create(InnovationKey::connection(source, target));
        match self.connections.get_mut(&innovation) {
            Some(existing) if existing.source == source && existing.target == target => {
                existing.enabled = true;
                existing.weight = weight;
            }
            Some(_) => return Err(reject(ConnectionRejection::InnovationConflict)),
            None => {
                self.connections.insert(
                    innovation,
                    ConnectionGene::new(innovation, source, target, weight),
                );
            }
        }

        tracing::trace!(source, target, innovation, "added connection");
        Ok(innovation)
    }

    /// Split the connection with the given innovation number by a new hidden node.
    ///
    /// The original connection is disabled and two new connections are created:
    /// `source -> new` with weight 1.0 and `new -> target` with the original weight.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidMutation`] if the connection is unknown or
    /// already disabled.
    pub fn add_node(&mut self, registry: &InnovationRegistry, innovation: u64) -> NeatResult<NodeId> {
        let conn = self
            .connections
            .get_mut(&innovation)
            .ok_or(NeatError::InvalidMutation {
                innovation,
                reason: "unknown connection",
            })?;
        if !conn.enabled {
            return Err(NeatError::InvalidMutation {
                innovation,
                reason: "connection is already disabled",
            });
        }

        conn.enabled = false;
        let (source, target, weight) = (conn.source, conn.target, conn.weight);

        // next_node_id exceeds every existing id, so pushing keeps the arena sorted.
        let new_id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.push(NodeGene::hidden(new_id, Activation::default()));

        let in_inn = registry.get_or_create(InnovationKey::split(source, new_id));
        self.connections
            .insert(in_inn, ConnectionGene::new(in_inn, source, new_id, 1.0));

        let out_inn = registry.get_or_create(InnovationKey::split(new_id, target));
        self.connections
            .insert(out_inn, ConnectionGene::new(out_inn, new_id, target, weight));

        tracing::trace!(innovation, new_id, "split connection");
        Ok(new_id)
    }

    /// Add a connection between a uniformly random unconnected valid pair.
    ///
    /// Pairs joined by any connection gene, enabled or not, are skipped.
    /// Returns `None` when the genome is fully connected.
    pub fn mutate_add_connection<R: Rng>(
        &mut self,
        registry: &InnovationRegistry,
        rng: &mut R,
    ) -> Option<u64> {
        let existing: HashSet<(NodeId, NodeId)> = self
            .connections
            .values()
            .map(|c| (c.source, c.target))
            .collect();

        let candidates: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .filter(|n| n.kind != NodeKind::Output)
            .flat_map(|src| {
                self.nodes
                    .iter()
                    .filter(|n| n.kind != NodeKind::Input)
                    .map(move |tgt| (src.id, tgt.id))
            })
            .filter(|&(s, t)| s != t && !existing.contains(&(s, t)))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let (source, target) = candidates[rng.random_range(0..candidates.len())];
        let weight = random_weight(rng);
        self.add_connection(registry, source, target, weight).ok()
    }

    /// Split a uniformly random enabled connection.
    ///
    /// Returns `None` when no connection is enabled.
    pub fn mutate_add_node<R: Rng>(
        &mut self,
        registry: &InnovationRegistry,
        rng: &mut R,
    ) -> Option<NodeId> {
        let enabled: Vec<u64> = self
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.innovation)
            .collect();

        if enabled.is_empty() {
            return None;
        }

        let innovation = enabled[rng.random_range(0..enabled.len())];
        self.add_node(registry, innovation).ok()
    }

    /// Disable a uniformly random enabled connection.
    ///
    /// Returns the disabled innovation, or `None` when nothing is enabled.
    /// Disabled genes stay in the genome and can come back through
    /// [`add_connection`](Self::add_connection) or crossover.
    pub fn mutate_disable_connection<R: Rng>(&mut self, rng: &mut R) -> Option<u64> {
        let enabled: Vec<u64> = self
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.innovation)
            .collect();
        if enabled.is_empty() {
            return None;
        }

        let innovation = enabled[rng.random_range(0..enabled.len())];
        let conn = self.connections.get_mut(&innovation)?;
        conn.enabled = false;
        tracing::trace!(innovation, "disabled connection");
        Some(innovation)
    }

    /// Mutate connection weights.
    ///
    /// Each connection is perturbed by uniform noise in `[-scale, scale]` with
    /// `perturb_probability`; otherwise it is replaced by a fresh random weight
    /// with `replace_probability`; otherwise it is left alone.
    pub fn mutate_weights<R: Rng>(
        &mut self,
        rng: &mut R,
        perturb_probability: f32,
        replace_probability: f32,
        scale: f32,
    ) {
        for conn in self.connections.values_mut() {
            if rng.random::<f32>() < perturb_probability {
                conn.weight += (rng.random::<f32>() * 2.0 - 1.0) * scale;
            } else if rng.random::<f32>() < replace_probability {
                conn.weight = random_weight(rng);
            } else {
                continue;
            }
            // Keep weights bounded so sums never overflow to Inf/NaN.
            conn.weight = conn.weight.clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT);
        }
    }

    /// Give a random hidden node a random activation from `palette`.
    ///
    /// Returns the mutated node, or `None` without hidden nodes or with an
    /// empty palette.
    pub fn mutate_activation<R: Rng>(&mut self, rng: &mut R, palette: &[Activation]) -> Option<NodeId> {
        if palette.is_empty() {
            return None;
        }
        let hidden: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind == NodeKind::Hidden)
            .map(|(idx, _)| idx)
            .collect();
        if hidden.is_empty() {
            return None;
        }

        let node = &mut self.nodes[hidden[rng.random_range(0..hidden.len())]];
        node.activation = palette[rng.random_range(0..palette.len())];
        Some(node.id)
    }

    /// Produce a child aligned on innovation numbers.
    ///
    /// Matching genes come from either parent with equal probability; if the
    /// gene is disabled in either parent, the child's copy is enabled with
    /// `reenable_probability`. Disjoint and excess genes come only from the
    /// fitter parent, and `self` wins fitness ties. The child keeps the fitter
    /// parent's input and output nodes plus every hidden node its inherited
    /// connections reference, with ids unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::IncompatibleGenome`] if the shapes differ.
    pub fn crossover<R: Rng>(
        &self,
        other: &Self,
        rng: &mut R,
        reenable_probability: f32,
    ) -> NeatResult<Self> {
        if self.shape() != other.shape() {
            return Err(NeatError::IncompatibleGenome {
                expected: self.shape(),
                actual: other.shape(),
            });
        }

        let self_is_fitter = self.fitness >= other.fitness;
        let fitter = if self_is_fitter { self } else { other };
        let io = self.input_size + self.output_size;

        let mut connections = BTreeMap::new();
        let mut hidden: BTreeMap<NodeId, NodeGene> = BTreeMap::new();

        let innovations: BTreeSet<u64> = self
            .connections
            .keys()
            .chain(other.connections.keys())
            .copied()
            .collect();

        for innovation in innovations {
            let (gene, donor) = match (
                self.connections.get(&innovation),
                other.connections.get(&innovation),
            ) {
                (Some(a), Some(b)) => {
                    let (chosen, donor) = if rng.random::<bool>() {
                        (a, self)
                    } else {
                        (b, other)
                    };
                    let mut gene = chosen.clone();
                    if !a.enabled || !b.enabled {
                        gene.enabled = rng.random::<f32>() < reenable_probability;
                    }
                    (gene, donor)
                }
                (Some(a), None) if self_is_fitter => (a.clone(), self),
                (None, Some(b)) if !self_is_fitter => (b.clone(), other),
                _ => continue,
            };

            for id in [gene.source, gene.target] {
                if id >= io && !hidden.contains_key(&id) {
                    let node = donor
                        .node(id)
                        .cloned()
                        .unwrap_or_else(|| NodeGene::hidden(id, Activation::default()));
                    hidden.insert(id, node);
                }
            }
            connections.insert(innovation, gene);
        }

        let mut nodes = Vec::with_capacity(io + hidden.len());
        nodes.extend_from_slice(&fitter.nodes[..io]);
        nodes.extend(hidden.into_values());

        tracing::trace!(
            connections = connections.len(),
            nodes = nodes.len(),
            "crossover produced child"
        );

        Ok(Self {
            nodes,
            connections,
            input_size: self.input_size,
            output_size: self.output_size,
            next_node_id: self.next_node_id.max(other.next_node_id),
            fitness: 0.0,
            state: Vec::new(),
        })
    }

    /// Compatibility distance to another genome.
    ///
    /// `c_e·E/N + c_d·D/N + c_w·W̄`, with excess `E`, disjoint `D`, mean weight
    /// difference of matching genes `W̄` and `N` the larger connection count.
    #[must_use]
    pub fn compatibility_distance(&self, other: &Self, config: &NeatConfig) -> f32 {
        let self_max = self.connections.keys().next_back().copied();
        let other_max = other.connections.keys().next_back().copied();

        let mut matching = 0usize;
        let mut disjoint = 0usize;
        let mut excess = 0usize;
        let mut weight_diff_sum = 0.0;

        for (innovation, conn) in &self.connections {
            if let Some(other_conn) = other.connections.get(innovation) {
                matching += 1;
                weight_diff_sum += (conn.weight - other_conn.weight).abs();
            } else if other_max.map_or(true, |max| *innovation > max) {
                excess += 1;
            } else {
                disjoint += 1;
            }
        }

        for innovation in other.connections.keys() {
            if !self.connections.contains_key(innovation) {
                if self_max.map_or(true, |max| *innovation > max) {
                    excess += 1;
                } else {
                    disjoint += 1;
                }
            }
        }

        let n = self.connections.len().max(other.connections.len()).max(1) as f32;
        let avg_weight_diff = if matching > 0 {
            weight_diff_sum / matching as f32
        } else {
            0.0
        };

        (config.compatibility_excess_coeff * excess as f32 / n)
            + (config.compatibility_disjoint_coeff * disjoint as f32 / n)
            + (config.compatibility_weight_coeff * avg_weight_diff)
    }
}
