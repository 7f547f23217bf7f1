/// Squared error with a dead zone around each target.
///
/// An output within `error_bar` of its target contributes nothing; beyond
/// that, only the excess distance is squared.
pub struct DeadZoneLoss;

impl DeadZoneLoss {
    /// Sum over outputs of `shrink(predicted - expected, error_bar)²`.
    /// Not divided by the output count.
    pub fn loss(predicted: &[f64], expected: &[f64], error_bar: f64) -> f64 {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| Self::shrink(p - e, error_bar).powi(2))
            .sum()
    }

    /// Moves `diff` toward zero by `error_bar`, stopping at zero.
    pub fn shrink(diff: f64, error_bar: f64) -> f64 {
        if diff < 0.0 {
            (diff + error_bar).min(0.0)
        } else {
            (diff - error_bar).max(0.0)
        }
    }
}
