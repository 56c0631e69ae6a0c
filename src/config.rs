//! Reproduction and mutation parameters.

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{NeatError, NeatResult};

/// Configuration for reproduction and mutation in an [`Ecosystem`](crate::Ecosystem).
///
/// Probabilities are per offspring unless stated otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatConfig {
    /// Probability of running `mutate_weights` on an offspring.
    pub weight_mutation_prob: f32,
    /// Per-connection probability of perturbing a weight.
    pub weight_perturb_prob: f32,
    /// Per-connection probability of replacing a weight that was not perturbed.
    pub weight_replace_prob: f32,
    /// Half-width of the uniform perturbation noise.
    pub weight_perturb_scale: f32,
    /// Probability of attempting an add-connection mutation on an offspring.
    pub add_connection_prob: f32,
    /// Probability of attempting an add-node mutation on an offspring.
    pub add_node_prob: f32,
    /// Probability of disabling a random enabled connection on an offspring.
    pub disable_connection_prob: f32,
    /// Probability of changing a random hidden node's activation on an offspring.
    pub activation_mutation_prob: f32,
    /// Activation functions that activation mutation chooses from.
    pub hidden_activations: Vec<Activation>,
    /// Chance that a matching gene disabled in either parent is enabled in the child.
    pub reenable_prob: f32,
    /// Percentage of the population culled by [`Ecosystem::evolve`](crate::Ecosystem::evolve).
    pub kill_percentage: f32,
    /// Coefficient for excess genes in compatibility distance.
    pub compatibility_excess_coeff: f32,
    /// Coefficient for disjoint genes in compatibility distance.
    pub compatibility_disjoint_coeff: f32,
    /// Coefficient for the mean weight difference of matching genes.
    pub compatibility_weight_coeff: f32,
}

impl Default for NeatConfig {
    fn default() -> Self {
        Self {
            weight_mutation_prob: 0.8,
            weight_perturb_prob: 0.9,
            weight_replace_prob: 0.1,
            weight_perturb_scale: 0.5,
            add_connection_prob: 0.3,
            add_node_prob: 0.1,
            disable_connection_prob: 0.01,
            activation_mutation_prob: 0.0,
            hidden_activations: vec![Activation::ModifiedSigmoid],
            reenable_prob: 0.25,
            kill_percentage: 50.0,
            compatibility_excess_coeff: 1.0,
            compatibility_disjoint_coeff: 1.0,
            compatibility_weight_coeff: 0.4,
        }
    }
}

impl NeatConfig {
    /// Weight mutation only: the topology of every offspring matches its parents.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            add_connection_prob: 0.0,
            add_node_prob: 0.0,
            ..Default::default()
        }
    }

    /// Aggressive structural search over a wider activation palette.
    #[must_use]
    pub fn exploratory() -> Self {
        Self {
            add_connection_prob: 0.5,
            add_node_prob: 0.2,
            activation_mutation_prob: 0.1,
            hidden_activations: vec![
                Activation::ModifiedSigmoid,
                Activation::Tanh,
                Activation::ReLU,
                Activation::Gaussian,
                Activation::Sine,
            ],
            ..Default::default()
        }
    }

    /// Check every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Configuration`] naming the first offending field.
    pub fn validate(&self) -> NeatResult<()> {
        let probabilities = [
            ("weight_mutation_prob", self.weight_mutation_prob),
            ("weight_perturb_prob", self.weight_perturb_prob),
            ("weight_replace_prob", self.weight_replace_prob),
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("disable_connection_prob", self.disable_connection_prob),
            ("activation_mutation_prob", self.activation_mutation_prob),
            ("reenable_prob", self.reenable_prob),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(NeatError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !(self.weight_perturb_scale >= 0.0 && self.weight_perturb_scale.is_finite()) {
            return Err(NeatError::Configuration(format!(
                "weight_perturb_scale must be finite and non-negative, got {}",
                self.weight_perturb_scale
            )));
        }
        check_kill_percentage(self.kill_percentage)?;
        if self.hidden_activations.is_empty() {
            return Err(NeatError::Configuration(
                "hidden_activations must not be empty".into(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_kill_percentage(kill_percentage: f32) -> NeatResult<()> {
    if (0.0..=100.0).contains(&kill_percentage) {
        Ok(())
    } else {
        Err(NeatError::Configuration(format!(
            "kill_percentage must be within [0, 100], got {kill_percentage}"
        )))
    }
}
