//! Activation functions for evolved networks.
//!
//! Every node carries its own [`Activation`]. Inputs pass values through
//! unchanged; hidden and output nodes default to [`Activation::ModifiedSigmoid`],
//! the steepened sigmoid commonly used for NEAT.

use serde::{Deserialize, Serialize};

/// Slope of the modified sigmoid.
const MODIFIED_SIGMOID_SLOPE: f32 = 4.9;

/// Transfer function applied to a node's weighted input sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Activation {
    /// f(x) = x
    Identity,
    /// f(x) = 1 / (1 + e^(-4.9x))
    #[default]
    ModifiedSigmoid,
    /// f(x) = 1 / (1 + e^(-x))
    Sigmoid,
    /// f(x) = tanh(x)
    Tanh,
    /// f(x) = max(0, x)
    ReLU,
    /// f(x) = e^(-x^2)
    Gaussian,
    /// f(x) = sin(x)
    Sine,
    /// f(x) = |x|
    Abs,
    /// f(x) = x^2
    Square,
}

impl Activation {
    /// All available activation functions.
    pub const ALL: [Self; 9] = [
        Self::Identity,
        Self::ModifiedSigmoid,
        Self::Sigmoid,
        Self::Tanh,
        Self::ReLU,
        Self::Gaussian,
        Self::Sine,
        Self::Abs,
        Self::Square,
    ];

    /// Apply this activation function to an input value.
    ///
    /// NaN propagates. Infinite inputs map to the function's limit where one
    /// exists, so a saturated node never poisons downstream sums with NaN.
    #[inline]
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        if x.is_nan() {
            return f32::NAN;
        }

        match self {
            Self::Identity => x,
            Self::ModifiedSigmoid => logistic(MODIFIED_SIGMOID_SLOPE * x),
            Self::Sigmoid => logistic(x),
            Self::Tanh => {
                if x.is_infinite() {
                    return x.signum();
                }
                x.tanh()
            }
            Self::ReLU => x.max(0.0),
            Self::Gaussian => {
                // exp(-676) underflows to zero anyway
                if x.abs() > 26.0 {
                    0.0
                } else {
                    (-x * x).exp()
                }
            }
            Self::Sine => {
                if x.is_infinite() {
                    return 0.0;
                }
                x.sin()
            }
            Self::Abs => x.abs(),
            Self::Square => x * x,
        }
    }
}

#[inline]
fn logistic(x: f32) -> f32 {
    if x == f32::INFINITY {
        return 1.0;
    }
    if x == f32::NEG_INFINITY {
        return 0.0;
    }
    let clamped = x.clamp(-88.0, 88.0);
    1.0 / (1.0 + (-clamped).exp())
}
