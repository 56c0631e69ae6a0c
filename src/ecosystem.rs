//! Population lifecycle: creation, ranking, culling and refill.
//!
//! An [`Ecosystem`] owns a fixed-size, ordered population of [`Genome`]s, the
//! [`InnovationRegistry`] they share, and a seeded RNG. The caller evaluates
//! genomes and writes their `fitness`; [`Ecosystem::next_generation`] then
//! ranks the population, removes the weakest, and refills it by
//! fitness-weighted crossover followed by mutation.
//!
//! Fitness is used twice. Ranking uses the raw value. Parent selection uses
//! the value clamped at zero as a weight, so negative scores are legal but
//! give no extra chance of reproducing; when every survivor weighs zero the
//! parents are drawn uniformly.

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{check_kill_percentage, NeatConfig};
use crate::error::{NeatError, NeatResult};
use crate::genome::Genome;
use crate::innovation::InnovationRegistry;

fn unseeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(0)
}

/// A population of genomes evolving under one innovation registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ecosystem {
    config: NeatConfig,
    registry: InnovationRegistry,
    population: Vec<Genome>,
    shape: Option<(usize, usize)>,
    generation: u64,
    /// Not persisted; call [`reseed`](Self::reseed) after loading.
    #[serde(skip, default = "unseeded_rng")]
    rng: ChaCha8Rng,
}

impl Ecosystem {
    /// Create an empty ecosystem.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Configuration`] if `config` fails validation.
    pub fn new(config: NeatConfig, seed: u64) -> NeatResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: InnovationRegistry::new(),
            population: Vec::new(),
            shape: None,
            generation: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    #[must_use]
    pub fn config(&self) -> &NeatConfig {
        &self.config
    }

    /// The registry shared by every genome in this ecosystem.
    #[must_use]
    pub fn registry(&self) -> &InnovationRegistry {
        &self.registry
    }

    /// The population, in ranking order after each generation.
    #[must_use]
    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    /// Mutable access for assigning fitness. The population size cannot change.
    pub fn population_mut(&mut self) -> &mut [Genome] {
        &mut self.population
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.population.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// `(input_size, output_size)` shared by every genome, once a population exists.
    #[must_use]
    pub const fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    /// Current generation number, starting at 1.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the RNG, e.g. after deserializing.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    /// Build a new population of `size` genomes and reset the registry.
    ///
    /// Supply either both `input_size` and `output_size`, which yields
    /// structurally minimal genomes, or a `parent_genome`, which yields copies
    /// that each receive one add-connection and one add-node attempt unless
    /// `mutate` is false.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Configuration`] unless exactly one of the two
    /// sources is given and `size` is at least 1.
    pub fn create_initial_population(
        &mut self,
        size: usize,
        input_size: Option<usize>,
        output_size: Option<usize>,
        parent_genome: Option<&Genome>,
        mutate: bool,
    ) -> NeatResult<()> {
        let shape = match (input_size, output_size, parent_genome) {
            (Some(inputs), Some(outputs), None) => (inputs, outputs),
            (None, None, Some(parent)) => parent.shape(),
            (None, None, None) => {
                return Err(NeatError::Configuration(
                    "no input/output sizes or parent genome given".into(),
                ))
            }
            (Some(_), None, None) => {
                return Err(NeatError::Configuration("output_size missing".into()))
            }
            (None, Some(_), None) => {
                return Err(NeatError::Configuration("input_size missing".into()))
            }
            _ => {
                return Err(NeatError::Configuration(
                    "give either input/output sizes or a parent genome, not both".into(),
                ))
            }
        };
        if size == 0 {
            return Err(NeatError::Configuration(
                "population size must be at least 1".into(),
            ));
        }

        self.registry.reset();
        self.population = match parent_genome {
            Some(parent) => {
                self.registry.register_genome(parent);
                (0..size).map(|_| self.spawn(parent, mutate)).collect()
            }
            None => (0..size).map(|_| Genome::new(shape.0, shape.1)).collect(),
        };
        self.shape = Some(shape);
        self.generation = 1;

        tracing::info!(
            size,
            inputs = shape.0,
            outputs = shape.1,
            from_parent = parent_genome.is_some(),
            "created initial population"
        );
        Ok(())
    }

    /// The fittest genome; ties go to the earliest index and NaN scores are
    /// passed over unless every score is NaN.
    #[must_use]
    pub fn best_genome(&self) -> Option<&Genome> {
        let mut iter = self.population.iter();
        let first = iter.next()?;
        Some(iter.fold(first, |best, genome| {
            // NaN never wins, and never blocks a real score from winning.
            let beats = genome.fitness > best.fitness
                || (best.fitness.is_nan() && !genome.fitness.is_nan());
            if beats {
                genome
            } else {
                best
            }
        }))
    }

    /// Assign fitness to every genome with `score`, in population order.
    pub fn assign_fitness<F>(&mut self, mut score: F)
    where
        F: FnMut(&mut Genome) -> f32,
    {
        for genome in &mut self.population {
            genome.fitness = score(genome);
        }
    }

    /// Advance one generation using the configured kill percentage.
    ///
    /// # Errors
    ///
    /// See [`next_generation`](Self::next_generation).
    pub fn evolve(&mut self) -> NeatResult<()> {
        self.next_generation(self.config.kill_percentage, None)
    }

    /// Replace the population with the next generation.
    ///
    /// The population is ranked by fitness, highest first, with ties kept in
    /// population order, and the bottom `ceil(kill_percentage% · size)` are
    /// removed while always keeping at least one survivor.
    ///
    /// With `parent_genome`, the new population is instead `size` mutated
    /// copies of it. Otherwise survivors carry over unchanged, and offspring
    /// of two distinct fitness-weighted survivors are added until the
    /// original size is restored. The earlier-ranked parent is the first
    /// crossover argument, so it wins fitness ties.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Configuration`] if `kill_percentage` is outside
    /// `[0, 100]`, no population exists, or a fitness is NaN, and
    /// [`NeatError::IncompatibleGenome`] if `parent_genome` has another shape.
    pub fn next_generation(
        &mut self,
        kill_percentage: f32,
        parent_genome: Option<&Genome>,
    ) -> NeatResult<()> {
        check_kill_percentage(kill_percentage)?;
        let Some(shape) = self.shape.filter(|_| !self.population.is_empty()) else {
            return Err(NeatError::Configuration(
                "population has not been created".into(),
            ));
        };
        if let Some(idx) = self.population.iter().position(|g| g.fitness.is_nan()) {
            return Err(NeatError::Configuration(format!(
                "genome {idx} has NaN fitness"
            )));
        }

        let size = self.population.len();

        if let Some(parent) = parent_genome {
            if parent.shape() != shape {
                return Err(NeatError::IncompatibleGenome {
                    expected: shape,
                    actual: parent.shape(),
                });
            }
            // Survivors are discarded, so the lineage restarts from the parent.
            self.registry.reset();
            self.registry.register_genome(parent);
            self.population = (0..size).map(|_| self.spawn(parent, true)).collect();
            self.generation += 1;
            tracing::debug!(generation = self.generation, size, "reseeded from parent genome");
            return Ok(());
        }

        let mut ranked = self.population.clone();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let culled = cull_count(kill_percentage, size);
        let survivors = size - culled;
        ranked.truncate(survivors);

        let best = ranked[0].fitness;
        let mean = ranked.iter().map(|g| g.fitness).sum::<f32>() / survivors as f32;
        let weights = selection_weights(&ranked);
        let clamped = ranked.iter().filter(|g| g.fitness < 0.0).count();

        while ranked.len() < size {
            let (first, second) = self.select_parents(&weights);
            let mut child = if first == second {
                self.clone_offspring(&ranked[first])
            } else {
                ranked[first].crossover(&ranked[second], &mut self.rng, self.config.reenable_prob)?
            };
            self.mutate_offspring(&mut child);
            ranked.push(child);
        }

        self.population = ranked;
        self.generation += 1;

        tracing::debug!(
            generation = self.generation,
            best,
            mean,
            culled,
            clamped,
            innovations = self.registry.len(),
            "advanced generation"
        );
        Ok(())
    }

    /// A fresh copy of `parent`, optionally given one add-connection and one
    /// add-node attempt.
    fn spawn(&mut self, parent: &Genome, mutate: bool) -> Genome {
        let mut genome = self.clone_offspring(parent);
        if mutate {
            genome.mutate_add_connection(&self.registry, &mut self.rng);
            genome.mutate_add_node(&self.registry, &mut self.rng);
        }
        genome
    }

    fn clone_offspring(&self, parent: &Genome) -> Genome {
        let mut genome = parent.clone();
        genome.fitness = 0.0;
        genome.reset_state();
        genome
    }

    fn mutate_offspring(&mut self, genome: &mut Genome) {
        let config = &self.config;
        let rng = &mut self.rng;

        if rng.random::<f32>() < config.weight_mutation_prob {
            genome.mutate_weights(
                rng,
                config.weight_perturb_prob,
                config.weight_replace_prob,
                config.weight_perturb_scale,
            );
        }
        if rng.random::<f32>() < config.add_connection_prob {
            genome.mutate_add_connection(&self.registry, rng);
        }
        if rng.random::<f32>() < config.add_node_prob {
            genome.mutate_add_node(&self.registry, rng);
        }
        if rng.random::<f32>() < config.disable_connection_prob {
            genome.mutate_disable_connection(rng);
        }
        if rng.random::<f32>() < config.activation_mutation_prob {
            genome.mutate_activation(rng, &config.hidden_activations);
        }
    }

    /// Two distinct survivor indices, earlier-ranked first. With a single
    /// survivor both indices are 0.
    fn select_parents(&mut self, weights: &[f32]) -> (usize, usize) {
        if weights.len() < 2 {
            return (0, 0);
        }
        let a = self.pick_weighted(weights, None);
        let b = self.pick_weighted(weights, Some(a));
        (a.min(b), a.max(b))
    }

    fn pick_weighted(&mut self, weights: &[f32], exclude: Option<usize>) -> usize {
        let masked: Vec<f32> = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| if Some(i) == exclude { 0.0 } else { w })
            .collect();

        match WeightedIndex::new(&masked) {
            Ok(dist) => dist.sample(&mut self.rng),
            // Every remaining weight is zero.
            Err(_) => {
                let allowed: Vec<usize> = (0..weights.len())
                    .filter(|&i| Some(i) != exclude)
                    .collect();
                allowed[self.rng.random_range(0..allowed.len())]
            }
        }
    }
}

/// Parent-selection weight per genome: fitness clamped at zero.
fn selection_weights(genomes: &[Genome]) -> Vec<f32> {
    genomes.iter().map(|g| g.fitness.max(0.0)).collect()
}

/// Number of genomes removed for a kill percentage, leaving at least one.
fn cull_count(kill_percentage: f32, size: usize) -> usize {
    let raw = (f64::from(kill_percentage) * size as f64 / 100.0).ceil() as usize;
    raw.min(size.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ecosystem() -> Ecosystem {
        Ecosystem::new(NeatConfig::default(), 42).expect("default config is valid")
    }

    fn seeded_parent(registry: &InnovationRegistry) -> Genome {
        let mut genome = Genome::new(2, 1);
        genome.add_connection(registry, 0, 2, 0.5).expect("valid connection");
        genome.add_connection(registry, 1, 2, -0.5).expect("valid connection");
        genome
    }

    #[test]
    fn test_cull_count() {
        assert_eq!(cull_count(50.0, 10), 5);
        assert_eq!(cull_count(0.0, 10), 0);
        assert_eq!(cull_count(100.0, 10), 9);
        assert_eq!(cull_count(7.0, 100), 7);
        assert_eq!(cull_count(33.3, 10), 4);
        assert_eq!(cull_count(100.0, 1), 0);
    }

    #[test]
    fn test_create_from_shape() {
        let mut eco = ecosystem();
        eco.create_initial_population(100, Some(4), Some(2), None, true)
            .expect("valid configuration");

        assert_eq!(eco.len(), 100);
        assert_eq!(eco.shape(), Some((4, 2)));
        for genome in eco.population() {
            assert_eq!(genome.shape(), (4, 2));
            assert_eq!(genome.num_connections(), 0);
        }
    }

    #[test]
    fn test_create_rejects_bad_sources() {
        let mut eco = ecosystem();
        let parent = Genome::new(2, 1);

        let bad = [
            (10, None, None, None),
            (10, Some(2), None, None),
            (10, None, Some(1), None),
            (10, Some(2), Some(1), Some(&parent)),
            (10, Some(2), None, Some(&parent)),
            (0, Some(2), Some(1), None),
        ];
        for (size, inputs, outputs, parent) in bad {
            assert!(matches!(
                eco.create_initial_population(size, inputs, outputs, parent, true),
                Err(NeatError::Configuration(_))
            ));
        }
        assert!(eco.is_empty());
    }

    #[test]
    fn test_create_from_parent_exact_copies() {
        let registry = InnovationRegistry::new();
        let mut parent = seeded_parent(&registry);
        parent.fitness = 9.0;

        let mut eco = ecosystem();
        eco.create_initial_population(15, None, None, Some(&parent), false)
            .expect("valid configuration");

        assert_eq!(eco.len(), 15);
        for genome in eco.population() {
            assert_eq!(genome.nodes(), parent.nodes());
            assert!(genome.connections().eq(parent.connections()));
            assert_eq!(genome.fitness, 0.0);
        }
        // The parent's innovations are never reissued.
        assert_eq!(eco.registry().next_innovation(), 2);
    }

    #[test]
    fn test_create_from_parent_mutates_copies() {
        let registry = InnovationRegistry::new();
        let parent = seeded_parent(&registry);

        let mut eco = ecosystem();
        eco.create_initial_population(20, None, None, Some(&parent), true)
            .expect("valid configuration");

        for genome in eco.population() {
            // Add-node always finds an enabled connection to split.
            assert_eq!(genome.nodes().len(), parent.nodes().len() + 1);
            assert!(genome.num_connections() >= parent.num_connections() + 2);
        }
    }

    #[test]
    fn test_create_resets_registry() {
        let mut eco = ecosystem();
        eco.create_initial_population(10, Some(2), Some(1), None, true)
            .expect("valid configuration");
        eco.assign_fitness(|_| 1.0);
        for _ in 0..3 {
            eco.evolve().expect("valid generation");
        }

        eco.create_initial_population(10, Some(2), Some(1), None, true)
            .expect("valid configuration");
        assert!(eco.registry().is_empty());
        assert_eq!(eco.generation(), 1);
    }

    #[test]
    fn test_best_genome_ties_prefer_earliest() {
        let mut eco = ecosystem();
        assert!(eco.best_genome().is_none());

        eco.create_initial_population(5, Some(1), Some(1), None, true)
            .expect("valid configuration");
        let fitness = [1.0, 4.0, 2.0, 4.0, 3.0];
        for (genome, f) in eco.population_mut().iter_mut().zip(fitness) {
            genome.fitness = f;
        }

        let best = eco.best_genome().expect("population exists");
        assert!(std::ptr::eq(best, &eco.population()[1]));
    }

    #[test]
    fn test_next_generation_validation() {
        let mut eco = ecosystem();
        assert!(matches!(
            eco.next_generation(50.0, None),
            Err(NeatError::Configuration(_))
        ));

        eco.create_initial_population(10, Some(2), Some(1), None, true)
            .expect("valid configuration");
        assert!(eco.next_generation(-1.0, None).is_err());
        assert!(eco.next_generation(100.5, None).is_err());
        assert!(eco.next_generation(f32::NAN, None).is_err());

        eco.population_mut()[3].fitness = f32::NAN;
        assert!(matches!(
            eco.next_generation(50.0, None),
            Err(NeatError::Configuration(_))
        ));

        eco.population_mut()[3].fitness = 0.0;
        let wrong_shape = Genome::new(3, 1);
        assert!(matches!(
            eco.next_generation(50.0, Some(&wrong_shape)),
            Err(NeatError::IncompatibleGenome { .. })
        ));
        assert_eq!(eco.generation(), 1);
    }

    #[test]
    fn test_next_generation_keeps_size() {
        let mut eco = ecosystem();
        eco.create_initial_population(30, Some(2), Some(2), None, true)
            .expect("valid configuration");

        for (round, kill) in [0.0, 10.0, 50.0, 99.0, 100.0].into_iter().enumerate() {
            eco.assign_fitness(|g| g.num_connections() as f32 + round as f32);
            eco.next_generation(kill, None).expect("valid generation");
            assert_eq!(eco.len(), 30);
            for genome in eco.population() {
                assert_eq!(genome.shape(), (2, 2));
            }
        }
        assert_eq!(eco.generation(), 6);
    }

    #[test]
    fn test_survivors_carry_over_in_rank_order() {
        let config = NeatConfig {
            weight_mutation_prob: 1.0,
            ..NeatConfig::default()
        };
        let mut eco = Ecosystem::new(config, 7).expect("valid config");
        eco.create_initial_population(6, Some(2), Some(1), None, true)
            .expect("valid configuration");
        let fitness = [0.5, 3.0, 1.0, 3.0, 2.0, 0.0];
        for (genome, f) in eco.population_mut().iter_mut().zip(fitness) {
            genome.fitness = f;
        }

        eco.next_generation(50.0, None).expect("valid generation");
        let kept: Vec<f32> = eco.population()[..3].iter().map(|g| g.fitness).collect();
        assert_eq!(kept, vec![3.0, 3.0, 2.0]);
        for child in &eco.population()[3..] {
            assert_eq!(child.fitness, 0.0);
        }
    }

    #[test]
    fn test_selection_weights_clamp_negative_fitness() {
        let genomes: Vec<Genome> = [-5.0, 2.5, 0.0, -0.1]
            .into_iter()
            .map(|f| {
                let mut g = Genome::new(1, 1);
                g.fitness = f;
                g
            })
            .collect();
        assert_eq!(selection_weights(&genomes), vec![0.0, 2.5, 0.0, 0.0]);
    }

    #[test]
    fn test_select_parents_follows_weights() {
        let mut eco = ecosystem();
        let weights = [5.0, 0.0, 0.0];
        let mut partners = [false; 3];

        for _ in 0..200 {
            let (first, second) = eco.select_parents(&weights);
            // Only index 0 carries weight; its partner falls back to uniform.
            assert_eq!(first, 0);
            assert_ne!(first, second);
            partners[second] = true;
        }
        assert_eq!(partners, [false, true, true]);
    }

    #[test]
    fn test_select_parents_uniform_when_all_weights_zero() {
        let mut eco = ecosystem();
        let weights = [0.0; 4];
        let mut seen = [false; 4];

        for _ in 0..200 {
            let (first, second) = eco.select_parents(&weights);
            assert!(first < second && second < 4);
            seen[first] = true;
            seen[second] = true;
        }
        assert_eq!(seen, [true; 4]);
    }

    #[test]
    fn test_select_parents_single_survivor() {
        let mut eco = ecosystem();
        assert_eq!(eco.select_parents(&[3.0]), (0, 0));
    }

    #[test]
    fn test_negative_fitness_is_clamped_for_selection() {
        let mut eco = ecosystem();
        eco.create_initial_population(8, Some(2), Some(1), None, true)
            .expect("valid configuration");
        eco.assign_fitness(|_| -5.0);
        eco.next_generation(50.0, None).expect("negative fitness is allowed");
        assert_eq!(eco.len(), 8);
    }

    #[test]
    fn test_next_generation_from_parent() {
        let registry = InnovationRegistry::new();
        let mut eco = ecosystem();
        eco.create_initial_population(12, Some(2), Some(1), None, true)
            .expect("valid configuration");
        let parent = seeded_parent(&registry);

        eco.next_generation(50.0, Some(&parent)).expect("valid generation");
        assert_eq!(eco.len(), 12);
        for genome in eco.population() {
            assert_eq!(genome.nodes().len(), parent.nodes().len() + 1);
        }
    }

    #[test]
    fn test_next_generation_from_foreign_parent_restarts_registry() {
        // The lineage assigns innovation 0 to 1 -> 2.
        let home = InnovationRegistry::new();
        let mut founder = Genome::new(2, 1);
        founder.add_connection(&home, 1, 2, 0.5).expect("valid connection");

        let mut eco = ecosystem();
        eco.create_initial_population(6, None, None, Some(&founder), false)
            .expect("valid configuration");

        // A parent from another registry uses innovation 0 for 0 -> 2.
        let foreign = InnovationRegistry::new();
        let mut parent = Genome::new(2, 1);
        parent.add_connection(&foreign, 0, 2, -0.5).expect("valid connection");

        eco.next_generation(50.0, Some(&parent)).expect("valid generation");

        let mut copy = parent.clone();
        let inn = copy
            .add_connection(eco.registry(), 1, 2, 0.1)
            .expect("1 -> 2 is legal in the parent");
        assert_ne!(inn, 0);

        // Every innovation names one structure across the whole population.
        let mut owners = std::collections::HashMap::new();
        for gene in eco.population().iter().flat_map(Genome::connections) {
            let endpoints = owners.entry(gene.innovation).or_insert((gene.source, gene.target));
            assert_eq!(*endpoints, (gene.source, gene.target));
        }
    }

    #[test]
    fn test_best_genome_skips_nan() {
        let mut eco = ecosystem();
        eco.create_initial_population(4, Some(1), Some(1), None, true)
            .expect("valid configuration");
        let fitness = [f32::NAN, 5.0, 1.0, 5.0];
        for (genome, f) in eco.population_mut().iter_mut().zip(fitness) {
            genome.fitness = f;
        }

        let best = eco.best_genome().expect("population exists");
        assert!(std::ptr::eq(best, &eco.population()[1]));
    }

    #[test]
    fn test_same_seed_same_history() {
        let run = || {
            let mut eco = Ecosystem::new(NeatConfig::exploratory(), 99).expect("valid config");
            eco.create_initial_population(20, Some(3), Some(1), None, true)
                .expect("valid configuration");
            for _ in 0..5 {
                eco.assign_fitness(|g| g.num_enabled_connections() as f32);
                eco.evolve().expect("valid generation");
            }
            serde_json::to_string(eco.population()).expect("serializable")
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut eco = ecosystem();
        eco.create_initial_population(10, Some(2), Some(1), None, true)
            .expect("valid configuration");
        for _ in 0..3 {
            eco.assign_fitness(|g| g.num_connections() as f32);
            eco.evolve().expect("valid generation");
        }

        let json = serde_json::to_string(&eco).expect("Serialization failed");
        let mut restored: Ecosystem = serde_json::from_str(&json).expect("Deserialization failed");
        restored.reseed(1);

        assert_eq!(restored.len(), eco.len());
        assert_eq!(restored.generation(), eco.generation());
        assert_eq!(restored.registry().len(), eco.registry().len());
        assert_eq!(restored.config(), eco.config());
        for (a, b) in restored.population().iter().zip(eco.population()) {
            assert_eq!(a.nodes(), b.nodes());
            assert!(a.connections().eq(b.connections()));
            assert_eq!(a.fitness, b.fitness);
        }
        restored.evolve().expect("restored ecosystem keeps evolving");
    }
}
