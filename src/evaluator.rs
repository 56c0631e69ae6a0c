//! Network evaluation for NEAT genomes.
//!
//! A genome may contain cycles, so evaluation is a single pass over the nodes
//! in ascending id order rather than a topological traversal. Each node sums
//! its enabled incoming connections; a source that has not been computed yet
//! in the current pass contributes the value it held after the previous pass.
//! Recurrent links therefore propagate with a one-step delay and every pass
//! costs O(nodes + connections).
//!
//! ## Determinism
//!
//! Incoming edges are stored in Compressed Sparse Row (CSR) form ordered by
//! innovation number, so the floating-point summation order depends only on
//! the genome's genes, never on mutation history.

use crate::activation::Activation;
use crate::error::{NeatError, NeatResult};
use crate::gene::NodeKind;
use crate::genome::Genome;

/// An evaluation plan compiled from a genome.
///
/// Node indices are positions in the genome's id-ordered node list, so the
/// plan can drive any state buffer of `node_count()` values.
#[derive(Debug, Clone)]
pub struct CompiledNetwork {
    /// Activation function per node.
    activation_fns: Vec<Activation>,
    // For node i, incoming edges are at [csr_offsets[i]..csr_offsets[i+1]).
    /// CSR: source node indices for all enabled connections.
    csr_sources: Vec<usize>,
    /// CSR: weights, parallel to `csr_sources`.
    csr_weights: Vec<f32>,
    /// CSR: offsets per node (len = node_count + 1).
    csr_offsets: Vec<usize>,
    /// Indices of input nodes, in id order.
    input_indices: Vec<usize>,
    /// Indices of output nodes, in id order.
    output_indices: Vec<usize>,
    /// Non-input nodes in ascending id order.
    eval_order: Vec<usize>,
}

impl CompiledNetwork {
    /// Build the CSR plan for a genome's enabled connections.
    #[must_use]
    pub fn compile(genome: &Genome) -> Self {
        let nodes = genome.nodes();
        let node_count = nodes.len();

        let mut activation_fns = Vec::with_capacity(node_count);
        let mut input_indices = Vec::with_capacity(genome.input_size());
        let mut output_indices = Vec::with_capacity(genome.output_size());
        let mut eval_order = Vec::with_capacity(node_count);

        for (idx, node) in nodes.iter().enumerate() {
            activation_fns.push(node.activation);
            match node.kind {
                NodeKind::Input => input_indices.push(idx),
                NodeKind::Output => {
                    output_indices.push(idx);
                    eval_order.push(idx);
                }
                NodeKind::Hidden => eval_order.push(idx),
            }
        }

        // Resolve endpoints once; connections iterate in innovation order.
        let edges: Vec<(usize, usize, f32)> = genome
            .connections()
            .filter(|c| c.enabled)
            .filter_map(|c| {
                let from = genome.node_index(c.source)?;
                let to = genome.node_index(c.target)?;
                Some((from, to, c.weight))
            })
            .collect();

        let mut csr_offsets = vec![0usize; node_count + 1];
        for &(_, to, _) in &edges {
            csr_offsets[to + 1] += 1;
        }
        for i in 0..node_count {
            csr_offsets[i + 1] += csr_offsets[i];
        }

        let mut cursor = csr_offsets.clone();
        let mut csr_sources = vec![0usize; edges.len()];
        let mut csr_weights = vec![0.0f32; edges.len()];
        for &(from, to, weight) in &edges {
            let slot = cursor[to];
            csr_sources[slot] = from;
            csr_weights[slot] = weight;
            cursor[to] += 1;
        }

        Self {
            activation_fns,
            csr_sources,
            csr_weights,
            csr_offsets,
            input_indices,
            output_indices,
            eval_order,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.activation_fns.len()
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.input_indices.len()
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.output_indices.len()
    }

    /// Run one evaluation pass over `state`, writing output activations to `outputs`.
    ///
    /// `state` holds the previous pass's node values and is updated in place;
    /// it is resized with zeros if its length does not match the plan.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Dimension`] if `inputs` or `outputs` has the wrong length.
    pub fn step(&self, state: &mut Vec<f32>, inputs: &[f32], outputs: &mut [f32]) -> NeatResult<()> {
        if inputs.len() != self.num_inputs() {
            return Err(NeatError::Dimension {
                expected: self.num_inputs(),
                actual: inputs.len(),
            });
        }
        if outputs.len() != self.num_outputs() {
            return Err(NeatError::Dimension {
                expected: self.num_outputs(),
                actual: outputs.len(),
            });
        }
        state.resize(self.node_count(), 0.0);

        for (&idx, &value) in self.input_indices.iter().zip(inputs) {
            state[idx] = value;
        }

        for &node_idx in &self.eval_order {
            let start = self.csr_offsets[node_idx];
            let end = self.csr_offsets[node_idx + 1];
            if start == end {
                // Unconnected nodes stay silent.
                state[node_idx] = 0.0;
                continue;
            }
            let mut sum = 0.0;
            for i in start..end {
                sum += state[self.csr_sources[i]] * self.csr_weights[i];
            }
            state[node_idx] = self.activation_fns[node_idx].apply(sum);
        }

        for (out, &idx) in outputs.iter_mut().zip(&self.output_indices) {
            *out = state[idx];
        }
        Ok(())
    }
}

/// A compiled network bundled with its own recurrent state.
///
/// Use this in hot loops (fitness evaluation over many steps) to avoid
/// recompiling the genome on every call. The genome itself is not touched.
#[derive(Debug, Clone)]
pub struct NetworkEvaluator {
    network: CompiledNetwork,
    state: Vec<f32>,
}

impl NetworkEvaluator {
    #[must_use]
    pub fn new(genome: &Genome) -> Self {
        let network = CompiledNetwork::compile(genome);
        let state = vec![0.0; network.node_count()];
        Self { network, state }
    }

    /// Evaluate into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Dimension`] on input or output length mismatch.
    pub fn evaluate_into(&mut self, inputs: &[f32], outputs: &mut [f32]) -> NeatResult<()> {
        self.network.step(&mut self.state, inputs, outputs)
    }

    /// Evaluate the network with given inputs.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Dimension`] if `inputs.len()` differs from the input count.
    pub fn evaluate(&mut self, inputs: &[f32]) -> NeatResult<Vec<f32>> {
        let mut outputs = vec![0.0; self.network.num_outputs()];
        self.evaluate_into(inputs, &mut outputs)?;
        Ok(outputs)
    }

    /// Clear recurrent state, as if no pass had run yet.
    pub fn reset(&mut self) {
        self.state.iter_mut().for_each(|v| *v = 0.0);
    }

    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.network.num_inputs()
    }

    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.network.num_outputs()
    }
}
