use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::network::connection::Connection;

/// Stable handle to a unit inside one `Net`.
///
/// Handles stay valid across unit deletion elsewhere in the net and are
/// preserved by `Clone` and JSON round trips, so a worker's copy uses the
/// same handles as the net it was copied from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub(crate) usize);

impl UnitId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A node holding an activation and its weighted inputs.
///
/// Inputs are kept in insertion order: that order is the canonical order for
/// flattened weights. A unit with no inputs is a source (an input-layer unit
/// or the bias) and is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub(crate) activation: f64,
    pub(crate) inputs: Vec<(UnitId, Connection)>,
    pub(crate) activation_fn: ActivationFunction,
}

impl Unit {
    pub(crate) fn new(activation_fn: ActivationFunction) -> Unit {
        Unit { activation: 0.0, inputs: Vec::new(), activation_fn }
    }

    pub fn activation(&self) -> f64 {
        self.activation
    }

    pub fn activation_fn(&self) -> ActivationFunction {
        self.activation_fn
    }

    pub fn set_activation_fn(&mut self, f: ActivationFunction) {
        self.activation_fn = f;
    }

    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Input connections in canonical order.
    pub fn inputs(&self) -> impl Iterator<Item = (UnitId, &Connection)> + '_ {
        self.inputs.iter().map(|(id, c)| (*id, c))
    }

    pub fn connection(&self, source: UnitId) -> Option<&Connection> {
        self.inputs.iter().find(|(id, _)| *id == source).map(|(_, c)| c)
    }

    pub fn connection_mut(&mut self, source: UnitId) -> Option<&mut Connection> {
        self.inputs.iter_mut().find(|(id, _)| *id == source).map(|(_, c)| c)
    }

    pub(crate) fn push_input(&mut self, source: UnitId, connection: Connection) {
        self.inputs.push((source, connection));
    }

    /// Inserts before the last input (the bias), keeping the bias last.
    pub(crate) fn insert_before_bias(&mut self, source: UnitId, connection: Connection) {
        let at = self.inputs.len().saturating_sub(1);
        self.inputs.insert(at, (source, connection));
    }

    pub(crate) fn remove_input(&mut self, source: UnitId) -> Option<Connection> {
        let pos = self.inputs.iter().position(|(id, _)| *id == source)?;
        Some(self.inputs.remove(pos).1)
    }
}
