use crate::error::{NetError, Result};
use crate::network::net::Net;
use crate::network::unit::UnitId;

/// Heuristic backward correction.
///
/// This is not a gradient: each output's error is scaled by the learning
/// rate, split evenly across the unit's inputs, and pushed into every input
/// weight in proportion to the source activation. The same share is then
/// pushed recursively into each source unit. Recursion follows connections,
/// not layer indices, so a unit reached along several paths is corrected
/// once per path.
pub struct Corrector {
    pub learn_rate: f64,
}

impl Corrector {
    pub fn new(learn_rate: f64) -> Corrector {
        Corrector { learn_rate }
    }

    /// Corrects the net toward `targets` from its current output.
    pub fn step(&self, net: &mut Net, targets: &[f64]) -> Result<()> {
        let width = net.output_width();
        if targets.len() != width {
            return Err(NetError::shape("target vector", width, targets.len()));
        }
        let outputs: Vec<UnitId> = match net.layer_count() {
            0 => Vec::new(),
            n => net.layer(n - 1)?.to_vec(),
        };
        for (id, &target) in outputs.into_iter().zip(targets.iter()) {
            let delta = (target - net.activation(id)) * self.learn_rate;
            Corrector::propagate_from_unit(net, id, delta);
        }
        Ok(())
    }

    /// Distributes `delta` over `unit`'s inputs and recurses into each source.
    /// Source units (no inputs) end the recursion.
    ///
    /// Only layered, acyclic graphs are supported; a cycle would not
    /// terminate.
    pub fn propagate_from_unit(net: &mut Net, unit: UnitId, delta: f64) {
        let count = net.unit_slot(unit).input_count();
        if count == 0 {
            return;
        }
        let delta = delta / count as f64;
        for k in 0..count {
            let source = net.unit_slot(unit).inputs[k].0;
            let source_activation = net.activation(source);
            net.unit_slot_mut(unit).inputs[k].1.adjust(source_activation * delta);
            Corrector::propagate_from_unit(net, source, delta);
        }
    }
}

impl Net {
    /// One heuristic correction step toward `targets` at `learn_rate`.
    pub fn back_propagate(&mut self, targets: &[f64], learn_rate: f64) -> Result<()> {
        Corrector::new(learn_rate).step(self, targets)
    }
}
