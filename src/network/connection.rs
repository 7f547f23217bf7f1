use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::network::spec::check_bounds;

/// A bounded, trainable weight from a source unit into the unit that owns it.
///
/// Every mutation clamps `weight` back into `[min_weight, max_weight]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    weight: f64,
    min_weight: f64,
    max_weight: f64,
    /// Scratch value for callers tracking weight movement between
    /// configurations. Training never reads it.
    pub delta: f64,
}

impl Connection {
    /// New connection with weight 0 (clamped if 0 lies outside the bounds).
    ///
    /// Bounds are assumed ordered; `Net` validates them before building.
    pub fn new(min_weight: f64, max_weight: f64) -> Connection {
        let mut c = Connection { weight: 0.0, min_weight, max_weight, delta: 0.0 };
        c.clamp();
        c
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn min_weight(&self) -> f64 {
        self.min_weight
    }

    pub fn max_weight(&self) -> f64 {
        self.max_weight
    }

    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
        self.clamp();
    }

    /// Adds `amount` to the weight, then clamps.
    pub fn adjust(&mut self, amount: f64) {
        self.weight += amount;
        self.clamp();
    }

    /// Overrides this connection's bounds and re-clamps the current weight.
    pub fn set_bounds(&mut self, min_weight: f64, max_weight: f64) -> Result<()> {
        check_bounds(min_weight, max_weight)?;
        self.min_weight = min_weight;
        self.max_weight = max_weight;
        self.clamp();
        Ok(())
    }

    /// Draws the weight uniformly from `[min_weight, max_weight]`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.weight = rng.gen::<f64>() * (self.max_weight - self.min_weight) + self.min_weight;
        self.clamp();
    }

    fn clamp(&mut self) {
        if self.weight > self.max_weight {
            self.weight = self.max_weight;
        } else if self.weight < self.min_weight {
            self.weight = self.min_weight;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn adjust_clamps_to_bounds() {
        let mut c = Connection::new(-2.0, 3.0);
        c.adjust(10.0);
        assert_eq!(c.weight(), 3.0);
        c.adjust(-100.0);
        assert_eq!(c.weight(), -2.0);
        c.adjust(1.5);
        assert_eq!(c.weight(), -0.5);
    }

    #[test]
    fn new_clamps_zero_into_positive_bounds() {
        let c = Connection::new(1.0, 2.0);
        assert_eq!(c.weight(), 1.0);
    }

    #[test]
    fn set_bounds_reclamps_and_rejects_inverted_range() {
        let mut c = Connection::new(-10.0, 10.0);
        c.set_weight(8.0);
        c.set_bounds(-1.0, 1.0).unwrap();
        assert_eq!(c.weight(), 1.0);
        assert!(c.set_bounds(2.0, 1.0).is_err());
        assert_eq!(c.min_weight(), -1.0);
    }

    #[test]
    fn randomize_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut c = Connection::new(-0.5, 0.25);
        for _ in 0..1000 {
            c.randomize(&mut rng);
            assert!(c.weight() >= -0.5 && c.weight() <= 0.25);
        }
    }
}
