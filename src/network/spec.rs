use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NetError, Result};

/// Serializable description of a net's topology and default weight bounds.
///
/// Can be stored as JSON independently of trained weights, so an
/// architecture can be kept before any search runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetSpec {
    /// Units per layer, input layer first. The bias unit is not counted.
    pub layer_sizes: Vec<usize>,
    /// Lower bound given to every connection at construction.
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,
    /// Upper bound given to every connection at construction.
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    /// Activation for every non-source unit.
    #[serde(default)]
    pub activation: ActivationFunction,
}

fn default_min_weight() -> f64 {
    -10.0
}

fn default_max_weight() -> f64 {
    10.0
}

/// Fails unless `min_weight <= max_weight` (NaN fails too).
pub(crate) fn check_bounds(min_weight: f64, max_weight: f64) -> Result<()> {
    if min_weight.is_nan() || max_weight.is_nan() || min_weight > max_weight {
        return Err(NetError::InvalidConfig(format!(
            "weight bounds [{min_weight}, {max_weight}] are not ordered"
        )));
    }
    Ok(())
}

impl NetSpec {
    pub fn new(layer_sizes: Vec<usize>) -> NetSpec {
        NetSpec {
            layer_sizes,
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            activation: ActivationFunction::default(),
        }
    }

    pub fn bounds(mut self, min_weight: f64, max_weight: f64) -> Self {
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self
    }

    pub fn activation(mut self, activation: ActivationFunction) -> Self {
        self.activation = activation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_sizes.is_empty() {
            return Err(NetError::InvalidConfig("a net needs at least one layer".into()));
        }
        check_bounds(self.min_weight, self.max_weight)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetSpec` from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
