use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NetError, Result};
use crate::loss::dead_zone::DeadZoneLoss;
use crate::network::connection::Connection;
use crate::network::spec::{check_bounds, NetSpec};
use crate::network::unit::{Unit, UnitId};

/// A layered graph of units joined by bounded connections.
///
/// Units live in an arena addressed by `UnitId`; `layers` lists the live
/// units of each layer in order. Every unit in layer `k > 0` holds one
/// connection per unit of layer `k - 1` followed by one from the shared bias
/// unit. Layer 0 units hold none.
///
/// `Clone` is a deep copy: search workers each train their own clone.
/// Deserialization checks the topology and rejects dangling unit handles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "NetRecord")]
pub struct Net {
    units: Vec<Option<Unit>>,
    layers: Vec<Vec<UnitId>>,
    bias: UnitId,
    min_weight: f64,
    max_weight: f64,
    activation: ActivationFunction,
}

/// Unchecked serialized form of `Net`.
#[derive(Deserialize)]
struct NetRecord {
    units: Vec<Option<Unit>>,
    layers: Vec<Vec<UnitId>>,
    bias: UnitId,
    min_weight: f64,
    max_weight: f64,
    activation: ActivationFunction,
}

impl TryFrom<NetRecord> for Net {
    type Error = NetError;

    fn try_from(record: NetRecord) -> Result<Net> {
        let net = Net {
            units: record.units,
            layers: record.layers,
            bias: record.bias,
            min_weight: record.min_weight,
            max_weight: record.max_weight,
            activation: record.activation,
        };
        net.check_topology()?;
        Ok(net)
    }
}

fn corrupt(msg: String) -> NetError {
    NetError::InvalidConfig(msg)
}

impl Net {
    /// Builds a net with default bounds `[-10, 10]` and the default
    /// activation, then randomizes its weights.
    pub fn new(layer_sizes: &[usize]) -> Net {
        Net::build(&NetSpec::new(layer_sizes.to_vec()))
    }

    pub fn from_spec(spec: &NetSpec) -> Result<Net> {
        spec.validate()?;
        Ok(Net::build(spec))
    }

    fn build(spec: &NetSpec) -> Net {
        let mut bias = Unit::new(spec.activation);
        bias.activation = 1.0;
        let mut net = Net {
            units: vec![Some(bias)],
            layers: Vec::with_capacity(spec.layer_sizes.len()),
            bias: UnitId(0),
            min_weight: spec.min_weight,
            max_weight: spec.max_weight,
            activation: spec.activation,
        };
        for &width in &spec.layer_sizes {
            net.add_layer(width);
        }
        net.randomize_weights();
        net
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Appends a layer of `width` units wired to the current last layer.
    /// Returns the new layer's index. Weights start at 0.
    pub fn add_layer(&mut self, width: usize) -> usize {
        self.layers.push(Vec::with_capacity(width));
        let layer = self.layers.len() - 1;
        let (min, max, activation) = (self.min_weight, self.max_weight, self.activation);
        for _ in 0..width {
            self.push_unit(layer, min, max, activation);
        }
        layer
    }

    /// Adds a unit to `layer` with the net's default bounds and activation.
    pub fn add_unit(&mut self, layer: usize) -> Result<UnitId> {
        self.add_unit_with(layer, self.min_weight, self.max_weight, self.activation)
    }

    /// Adds a unit to the end of `layer`.
    ///
    /// The unit gets a weight-0 connection from each unit of the previous
    /// layer and then one from the bias, all bounded by `[min_weight,
    /// max_weight]`. If a next layer exists, each of its units gains a
    /// connection from the new unit, inserted ahead of its bias connection.
    pub fn add_unit_with(
        &mut self,
        layer: usize,
        min_weight: f64,
        max_weight: f64,
        activation: ActivationFunction,
    ) -> Result<UnitId> {
        self.check_layer(layer)?;
        check_bounds(min_weight, max_weight)?;
        let id = self.push_unit(layer, min_weight, max_weight, activation);
        if let Some(next) = self.layers.get(layer + 1).cloned() {
            let (min, max) = (self.min_weight, self.max_weight);
            for dest in next {
                self.unit_slot_mut(dest).insert_before_bias(id, Connection::new(min, max));
            }
        }
        Ok(id)
    }

    fn push_unit(
        &mut self,
        layer: usize,
        min_weight: f64,
        max_weight: f64,
        activation: ActivationFunction,
    ) -> UnitId {
        let mut unit = Unit::new(activation);
        if layer > 0 {
            for &src in &self.layers[layer - 1] {
                unit.push_input(src, Connection::new(min_weight, max_weight));
            }
            unit.push_input(self.bias, Connection::new(min_weight, max_weight));
        }
        let id = UnitId(self.units.len());
        self.units.push(Some(unit));
        self.layers[layer].push(id);
        id
    }

    /// Removes the unit at `(layer, index)` and its connections into the
    /// next layer. A next-layer unit that no longer holds the edge is
    /// skipped without complaint.
    pub fn delete_unit(&mut self, layer: usize, index: usize) -> Result<()> {
        let id = self.id_at(layer, index)?;
        if let Some(next) = self.layers.get(layer + 1).cloned() {
            for dest in next {
                // Absent edges are fine: deletion is best effort.
                let _ = self.unit_slot_mut(dest).remove_input(id);
            }
        }
        self.layers[layer].remove(index);
        self.units[id.0] = None;
        Ok(())
    }

    /// Draws every connection weight uniformly from its own bounds.
    pub fn randomize_weights(&mut self) {
        self.randomize_weights_with(&mut rand::thread_rng());
    }

    pub fn randomize_weights_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for unit in self.units.iter_mut().flatten() {
            for (_, c) in unit.inputs.iter_mut() {
                c.randomize(rng);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Vec::len).collect()
    }

    pub fn layer(&self, layer: usize) -> Result<&[UnitId]> {
        self.check_layer(layer)?;
        Ok(self.layers[layer].as_slice())
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    pub fn output_width(&self) -> usize {
        self.layers.last().map_or(0, Vec::len)
    }

    pub fn bias_id(&self) -> UnitId {
        self.bias
    }

    /// Looks up a live unit. Returns `None` for deleted units.
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0).and_then(Option::as_ref)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn unit_at(&self, layer: usize, index: usize) -> Result<&Unit> {
        let id = self.id_at(layer, index)?;
        Ok(self.unit_slot(id))
    }

    pub fn id_at(&self, layer: usize, index: usize) -> Result<UnitId> {
        self.check_layer(layer)?;
        self.layers[layer].get(index).copied().ok_or(NetError::UnitOutOfRange {
            layer,
            unit: index,
            units: self.layers[layer].len(),
        })
    }

    /// Activation of a unit, or 0 for a deleted one.
    pub fn activation(&self, id: UnitId) -> f64 {
        self.unit(id).map_or(0.0, Unit::activation)
    }

    /// The connection `source -> dest`, for per-connection bound overrides.
    pub fn connection_mut(&mut self, dest: UnitId, source: UnitId) -> Option<&mut Connection> {
        self.unit_mut(dest)?.connection_mut(source)
    }

    /// Number of connections, i.e. the length of the flattened weights.
    pub fn connection_count(&self) -> usize {
        self.layered_units().map(|u| u.inputs.len()).sum()
    }

    pub(crate) fn unit_slot(&self, id: UnitId) -> &Unit {
        match &self.units[id.0] {
            Some(unit) => unit,
            None => unreachable!("unit {} was deleted but is still referenced", id.0),
        }
    }

    pub(crate) fn unit_slot_mut(&mut self, id: UnitId) -> &mut Unit {
        match &mut self.units[id.0] {
            Some(unit) => unit,
            None => unreachable!("unit {} was deleted but is still referenced", id.0),
        }
    }

    /// Live units in canonical order: layer by layer, unit by unit.
    fn layered_units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.layers.iter().flatten().map(move |&id| self.unit_slot(id))
    }

    /// Checks what the accessors rely on: every referenced unit is live, the
    /// bias is a source outside the layers, layer 0 holds only sources, each
    /// input comes from the previous layer or the bias, and every weight lies
    /// in its own bounds.
    fn check_topology(&self) -> Result<()> {
        check_bounds(self.min_weight, self.max_weight)?;
        let bias = self
            .unit(self.bias)
            .ok_or_else(|| corrupt(format!("bias unit {} does not exist", self.bias.0)))?;
        if !bias.is_source() {
            return Err(corrupt("bias unit has inputs".into()));
        }

        let mut placed = vec![false; self.units.len()];
        placed[self.bias.0] = true;
        for (layer, ids) in self.layers.iter().enumerate() {
            for &id in ids {
                let unit = self.unit(id).ok_or_else(|| {
                    corrupt(format!("layer {layer} refers to missing unit {}", id.0))
                })?;
                if std::mem::replace(&mut placed[id.0], true) {
                    return Err(corrupt(format!("unit {} is placed twice", id.0)));
                }
                if layer == 0 && !unit.is_source() {
                    return Err(corrupt(format!("input unit {} has inputs", id.0)));
                }
                for (src, c) in unit.inputs() {
                    let from_prev = layer > 0 && self.layers[layer - 1].contains(&src);
                    if src != self.bias && !from_prev {
                        return Err(corrupt(format!(
                            "unit {} takes input from unit {}, which is not in layer {}",
                            id.0,
                            src.0,
                            layer.saturating_sub(1)
                        )));
                    }
                    check_bounds(c.min_weight(), c.max_weight())?;
                    let w = c.weight();
                    if !(w >= c.min_weight() && w <= c.max_weight()) {
                        return Err(corrupt(format!(
                            "weight {w} on {} -> {} is outside its bounds",
                            src.0, id.0
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn check_layer(&self, layer: usize) -> Result<()> {
        if layer < self.layers.len() {
            Ok(())
        } else {
            Err(NetError::LayerOutOfRange { layer, layers: self.layers.len() })
        }
    }

    // -----------------------------------------------------------------------
    // Forward evaluation
    // -----------------------------------------------------------------------

    /// Writes `input` into the layer-0 activations.
    pub fn set_input(&mut self, input: &[f64]) -> Result<()> {
        let width = self.input_width();
        if input.len() != width {
            return Err(NetError::shape("input vector", width, input.len()));
        }
        for (i, &value) in input.iter().enumerate() {
            let id = self.layers[0][i];
            self.unit_slot_mut(id).activation = value;
        }
        Ok(())
    }

    /// Recomputes activations from `from_layer` to the output layer.
    /// Source units are left untouched.
    pub fn forward_propagate_from(&mut self, from_layer: usize) {
        for layer in from_layer..self.layers.len() {
            for i in 0..self.layers[layer].len() {
                let id = self.layers[layer][i];
                let unit = self.unit_slot(id);
                if unit.is_source() {
                    continue;
                }
                let sum: f64 = unit.inputs.iter()
                    .map(|(src, c)| self.activation(*src) * c.weight())
                    .sum();
                let activation = unit.activation_fn.function(sum);
                self.unit_slot_mut(id).activation = activation;
            }
        }
    }

    pub fn forward_propagate(&mut self) {
        self.forward_propagate_from(1);
    }

    /// Output-layer activations in order.
    pub fn output(&self) -> Vec<f64> {
        match self.layers.last() {
            Some(last) => last.iter().map(|&id| self.unit_slot(id).activation).collect(),
            None => Vec::new(),
        }
    }

    /// `set_input` + `forward_propagate`, returning the output.
    pub fn evaluate(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.set_input(input)?;
        self.forward_propagate();
        Ok(self.output())
    }

    /// Dead-zone loss of the current output against `targets`.
    pub fn loss(&self, targets: &[f64], error_bar: f64) -> Result<f64> {
        let width = self.output_width();
        if targets.len() != width {
            return Err(NetError::shape("target vector", width, targets.len()));
        }
        Ok(DeadZoneLoss::loss(&self.output(), targets, error_bar))
    }

    // -----------------------------------------------------------------------
    // Flattened weights
    // -----------------------------------------------------------------------

    /// All weights in canonical order: layer, then unit, then input order
    /// (bias last).
    pub fn export_weights(&self) -> Vec<f64> {
        self.layered_units()
            .flat_map(|u| u.inputs.iter().map(|(_, c)| c.weight()))
            .collect()
    }

    /// Inverse of `export_weights`. Values are clamped to each connection's
    /// bounds.
    pub fn import_weights(&mut self, weights: &[f64]) -> Result<()> {
        let expected = self.connection_count();
        if weights.len() != expected {
            return Err(NetError::shape("weight vector", expected, weights.len()));
        }
        let mut values = weights.iter();
        for l in 0..self.layers.len() {
            for i in 0..self.layers[l].len() {
                let id = self.layers[l][i];
                for (_, c) in self.unit_slot_mut(id).inputs.iter_mut() {
                    if let Some(&w) = values.next() {
                        c.set_weight(w);
                    }
                }
            }
        }
        Ok(())
    }

    /// Order-sensitive hash of the weights, used to tell worker copies apart
    /// in logs.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for w in self.export_weights() {
            w.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }

    /// True when both nets have the same shape, activations and weights,
    /// compared in canonical order.
    pub fn structurally_equal(&self, other: &Net) -> bool {
        if self.layer_sizes() != other.layer_sizes() {
            return false;
        }
        self.layered_units().zip(other.layered_units()).all(|(a, b)| {
            a.activation == b.activation
                && a.inputs.len() == b.inputs.len()
                && a.inputs.iter().zip(b.inputs.iter()).all(|((sa, ca), (sb, cb))| {
                    self.activation(*sa) == other.activation(*sb) && ca.weight() == cb.weight()
                })
        })
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Serializes the whole net (topology, bounds, weights, activations) to a
    /// pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a net previously written by `save_json`. A file with
    /// dangling unit handles or broken layering is `InvalidConfig`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Net> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let record: NetRecord = serde_json::from_reader(reader)?;
        Net::try_from(record)
    }
}
