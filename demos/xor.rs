//! XOR example using the NEAT ecosystem.
//!
//! This example demonstrates evolving a neural network to solve the XOR problem,
//! a classic benchmark for neuroevolution algorithms. The third input is a
//! constant bias of 1.0.
//!
//! Run with: `cargo run --example xor`
//! Set `RUST_LOG=symbios_neato=debug` to see per-generation statistics.

use symbios_neato::{Ecosystem, Genome, NeatConfig, NeatResult, NetworkEvaluator};
use tracing_subscriber::EnvFilter;

const CASES: [([f32; 3], f32); 4] = [
    ([0.0, 0.0, 1.0], 0.0),
    ([0.0, 1.0, 1.0], 1.0),
    ([1.0, 0.0, 1.0], 1.0),
    ([1.0, 1.0, 1.0], 0.0),
];

/// Passes per case, so signals cross the delayed hidden links.
const SETTLE_PASSES: usize = 4;

/// Run one XOR case from a clean state.
fn run_case(evaluator: &mut NetworkEvaluator, inputs: &[f32]) -> NeatResult<f32> {
    evaluator.reset();
    let mut output = [0.0];
    for _ in 0..SETTLE_PASSES {
        evaluator.evaluate_into(inputs, &mut output)?;
    }
    Ok(output[0])
}

/// Maximum fitness is 4.0 (perfect solution).
fn xor_fitness(genome: &Genome) -> f32 {
    let mut evaluator = NetworkEvaluator::new(genome);
    let mut error = 0.0;
    for (inputs, expected) in &CASES {
        match run_case(&mut evaluator, inputs) {
            Ok(output) => error += (output - expected).powi(2),
            Err(_) => return 0.0,
        }
    }
    4.0 - error
}

fn main() -> NeatResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("NEAT XOR Example");
    println!("================\n");

    let config = NeatConfig {
        add_connection_prob: 0.3,
        add_node_prob: 0.1,
        weight_mutation_prob: 0.8,
        weight_perturb_scale: 0.5,
        kill_percentage: 60.0,
        ..NeatConfig::default()
    };

    let population_size = 150;
    let generations = 200;

    let mut eco = Ecosystem::new(config, 42)?;
    eco.create_initial_population(population_size, Some(3), Some(1), None, true)?;

    println!("Population: {population_size}");
    println!("Generations: {generations}");
    println!();

    let mut solution_generation = None;

    for gen in 0..generations {
        eco.assign_fitness(|genome| xor_fitness(genome));

        let Some(best) = eco.best_genome() else {
            break;
        };
        if gen % 10 == 0 {
            let avg = eco.population().iter().map(|g| g.fitness).sum::<f32>()
                / eco.population().len() as f32;
            println!(
                "Gen {:3}: best={:.4}, avg={:.4}, nodes={}, connections={}",
                eco.generation(),
                best.fitness,
                avg,
                best.nodes().len(),
                best.num_enabled_connections()
            );
        }

        // Fitness >= 3.9 is close enough.
        if best.fitness >= 3.9 {
            solution_generation = Some(eco.generation());
            break;
        }

        eco.evolve()?;
    }

    println!();

    let Some(champion) = eco.best_genome() else {
        return Ok(());
    };

    println!("Evolution Complete!");
    println!("==================");
    println!("Best fitness: {:.4}", champion.fitness);
    println!("Nodes: {}", champion.nodes().len());
    println!("Connections: {}", champion.num_enabled_connections());
    println!("Hidden nodes: {}", champion.hidden_ids().len());
    println!("Innovations: {}", eco.registry().len());

    if let Some(gen) = solution_generation {
        println!("Solution found at generation: {gen}");
    }

    println!("\nChampion XOR outputs:");
    let mut evaluator = NetworkEvaluator::new(champion);
    for (inputs, expected) in &CASES {
        let output = run_case(&mut evaluator, inputs)?;
        let rounded = if output > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 {
            "✓"
        } else {
            "✗"
        };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            inputs[0] as i32, inputs[1] as i32, output, *expected as i32, status
        );
    }
    Ok(())
}
