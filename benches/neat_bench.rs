//! Benchmarks for symbios-neato.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use symbios_neato::{Ecosystem, Genome, InnovationRegistry, NeatConfig, NetworkEvaluator};

/// A genome with some hidden structure, grown against `registry`.
fn grown_genome(registry: &InnovationRegistry, rng: &mut ChaCha8Rng) -> Genome {
    let mut genome = Genome::new(4, 2);
    for _ in 0..10 {
        genome.mutate_add_connection(registry, rng);
    }
    for _ in 0..5 {
        genome.mutate_add_node(registry, rng);
        genome.mutate_add_connection(registry, rng);
    }
    genome
}

fn bench_mutation(c: &mut Criterion) {
    let registry = InnovationRegistry::new();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome = grown_genome(&registry, &mut rng);

    c.bench_function("genome_mutate_weights", |b| {
        let mut g = genome.clone();
        b.iter(|| {
            g.mutate_weights(&mut rng, 0.9, 0.1, 0.5);
            black_box(&g);
        });
    });

    c.bench_function("genome_mutate_add_connection", |b| {
        b.iter(|| {
            let mut g = genome.clone();
            black_box(g.mutate_add_connection(&registry, &mut rng));
        });
    });
}

fn bench_crossover(c: &mut Criterion) {
    let registry = InnovationRegistry::new();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let parent1 = grown_genome(&registry, &mut rng);
    let parent2 = grown_genome(&registry, &mut rng);

    c.bench_function("genome_crossover", |b| {
        b.iter(|| {
            let _ = black_box(parent1.crossover(&parent2, &mut rng, 0.25));
        });
    });
}

fn bench_evaluation(c: &mut Criterion) {
    let registry = InnovationRegistry::new();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut genome = grown_genome(&registry, &mut rng);
    let inputs = [0.5, -0.5, 0.25, 1.0];

    c.bench_function("genome_evaluate", |b| {
        b.iter(|| {
            let _ = black_box(genome.evaluate(&inputs));
        });
    });

    let mut evaluator = NetworkEvaluator::new(&genome);
    let mut outputs = [0.0; 2];
    c.bench_function("evaluator_evaluate_into", |b| {
        b.iter(|| {
            let _ = black_box(evaluator.evaluate_into(&inputs, &mut outputs));
        });
    });
}

fn bench_compatibility_distance(c: &mut Criterion) {
    let registry = InnovationRegistry::new();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let genome1 = grown_genome(&registry, &mut rng);
    let genome2 = grown_genome(&registry, &mut rng);
    let config = NeatConfig::default();

    c.bench_function("compatibility_distance", |b| {
        b.iter(|| {
            black_box(genome1.compatibility_distance(&genome2, &config));
        });
    });
}

fn bench_next_generation(c: &mut Criterion) {
    let mut eco = Ecosystem::new(NeatConfig::default(), 42).expect("valid config");
    eco.create_initial_population(150, Some(4), Some(2), None, true)
        .expect("valid configuration");

    c.bench_function("ecosystem_next_generation_150", |b| {
        b.iter(|| {
            eco.assign_fitness(|g| g.num_enabled_connections() as f32);
            let _ = black_box(eco.next_generation(50.0, None));
        });
    });
}

criterion_group!(
    benches,
    bench_mutation,
    bench_crossover,
    bench_evaluation,
    bench_compatibility_distance,
    bench_next_generation,
);
criterion_main!(benches);
