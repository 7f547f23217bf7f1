use serde::{Serialize, Deserialize};
use std::f64::consts::E;

/// Maps a unit's weighted input sum to its activation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum ActivationFunction {
    /// `0.5·x/(1+|x|) + 0.5`: smooth, monotonic, range (0, 1), no hard
    /// saturation. The default for every unit.
    #[default]
    Softsign,
    Sigmoid,
    Tanh,
    Identity,
    ReLU,
    /// Caller-supplied function. Cannot be written to JSON; serializing a
    /// net or spec that uses it fails.
    #[serde(skip)]
    Custom(fn(f64) -> f64),
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Softsign => 0.5 * x / (1.0 + x.abs()) + 0.5,
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Identity => x,
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Custom(f) => f(x),
        }
    }
}
