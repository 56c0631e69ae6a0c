//! # Symbios NEATO
//!
//! A NeuroEvolution of Augmenting Topologies (NEAT) engine: evolvable
//! neural-network genomes, a shared innovation registry, and an ecosystem
//! that breeds a population generation by generation.
//!
//! ## Features
//!
//! - **Registry-Based Innovation**: one [`InnovationRegistry`] per lineage maps
//!   every structural change `(source, target, kind)` to a number from a
//!   monotonic counter, so identical changes in different genomes align
//! - **Recurrent Networks**: cycles are allowed; evaluation is a single pass in
//!   node-id order with one-step delayed feedback
//! - **Deterministic**: all randomness comes from caller-supplied or seeded RNGs
//! - **Serde**: genomes, registries, configs and whole ecosystems serialize
//!
//! ## Quick Start
//!
//! ```rust
//! use symbios_neato::{Ecosystem, NeatConfig};
//!
//! let mut eco = Ecosystem::new(NeatConfig::default(), 42).unwrap();
//! eco.create_initial_population(50, Some(2), Some(1), None, true).unwrap();
//!
//! for _ in 0..10 {
//!     eco.assign_fitness(|genome| {
//!         genome.reset_state();
//!         let out = genome.evaluate(&[1.0, 0.0]).unwrap();
//!         1.0 - (1.0 - out[0]).abs()
//!     });
//!     eco.evolve().unwrap();
//! }
//!
//! let best = eco.best_genome().unwrap();
//! println!("best fitness so far: {}", best.fitness);
//! ```
//!
//! ## Architecture
//!
//! ### Innovation Registry
//!
//! Keys are node-id based. A new link from `a` to `b` is keyed
//! `(a, b, NewConnection)`; splitting a connection with a new node `n` creates
//! `(a, n, NodeSplit)` and `(n, b, NodeSplit)`. New node ids are allocated per
//! genome, so two genomes that split their own connection at the same moment
//! of their history receive the same node id and the same innovations.
//!
//! ### Genome Layout
//!
//! Input nodes take ids `0..input_size`, output nodes the next `output_size`
//! ids, and hidden nodes are appended as they are created. Connections are
//! stored keyed by innovation number, which is also the summation order used
//! during evaluation.

pub mod activation;
pub mod config;
pub mod ecosystem;
pub mod error;
pub mod evaluator;
pub mod gene;
pub mod genome;
pub mod innovation;

// Re-exports for convenience
pub use activation::Activation;
pub use config::NeatConfig;
pub use ecosystem::Ecosystem;
pub use error::{ConnectionRejection, NeatError, NeatResult};
pub use evaluator::{CompiledNetwork, NetworkEvaluator};
pub use gene::{ConnectionGene, NodeGene, NodeId, NodeKind};
pub use genome::Genome;
pub use innovation::{InnovationKey, InnovationRegistry, StructuralChange};
