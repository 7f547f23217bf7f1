use crate::error::{NetError, Result};
use crate::network::net::Net;

/// One training example: (input vector, target vector).
pub type Sample = (Vec<f64>, Vec<f64>);

/// Returned by `run_epoch` when a negative error bar disables cost tracking.
pub const COST_SKIPPED: f64 = -1.0;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Runs one full pass over `data`: for each sample, set input, forward,
/// accumulate loss, then correct toward the target at `learn_rate`.
///
/// Returns the summed (not averaged) dead-zone loss, measured before each
/// sample's correction. A negative `error_bar` skips loss computation and
/// returns `COST_SKIPPED`.
pub fn run_epoch(net: &mut Net, data: &[Sample], learn_rate: f64, error_bar: f64) -> Result<f64> {
    let track_cost = error_bar >= 0.0;
    let mut total = 0.0;
    for (input, target) in data {
        net.set_input(input)?;
        net.forward_propagate();
        if track_cost {
            total += net.loss(target, error_bar)?;
        }
        net.back_propagate(target, learn_rate)?;
    }
    Ok(if track_cost { total } else { COST_SKIPPED })
}

/// Summed dead-zone loss over `data` with no weight changes.
pub fn cost(net: &mut Net, data: &[Sample], error_bar: f64) -> Result<f64> {
    let mut total = 0.0;
    for (input, target) in data {
        net.set_input(input)?;
        net.forward_propagate();
        total += net.loss(target, error_bar)?;
    }
    Ok(total)
}

/// Checks every sample's shape against the net's input and output widths.
pub fn validate_samples(net: &Net, data: &[Sample]) -> Result<()> {
    if data.is_empty() {
        return Err(NetError::InvalidConfig("training data is empty".into()));
    }
    let (inputs, outputs) = (net.input_width(), net.output_width());
    for (input, target) in data {
        if input.len() != inputs {
            return Err(NetError::shape("sample input", inputs, input.len()));
        }
        if target.len() != outputs {
            return Err(NetError::shape("sample target", outputs, target.len()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_data() -> Vec<Sample> {
        vec![
            (vec![0.0, 0.0], vec![0.1]),
            (vec![1.0, 0.0], vec![0.1]),
            (vec![0.0, 1.0], vec![0.1]),
            (vec![1.0, 1.0], vec![0.9]),
        ]
    }

    #[test]
    fn cost_sums_sample_losses() {
        let mut net = Net::new(&[2, 1]);
        net.import_weights(&[0.0, 0.0, 0.0]).unwrap();
        // Every output is 0.5, so every sample is off by 0.4.
        let total = cost(&mut net, &and_data(), 0.0).unwrap();
        assert!((total - 4.0 * 0.16).abs() < 1e-12);
        let with_bar = cost(&mut net, &and_data(), 0.3).unwrap();
        assert!((with_bar - 4.0 * 0.01).abs() < 1e-12);
    }

    #[test]
    fn cost_does_not_train() {
        let mut net = Net::new(&[2, 3, 1]);
        let before = net.export_weights();
        cost(&mut net, &and_data(), 0.1).unwrap();
        assert_eq!(net.export_weights(), before);
    }

    #[test]
    fn epoch_reports_pre_correction_cost() {
        let mut net = Net::new(&[2, 1]);
        net.import_weights(&[0.0, 0.0, 0.0]).unwrap();
        let data = vec![(vec![0.0, 0.0], vec![1.0])];
        let epoch_cost = run_epoch(&mut net, &data, 1.0, 0.0).unwrap();
        assert_eq!(epoch_cost, 0.25);
        assert!(cost(&mut net, &data, 0.0).unwrap() < 0.25);
    }

    #[test]
    fn negative_error_bar_skips_cost_but_trains() {
        let mut net = Net::new(&[2, 1]);
        let before = net.export_weights();
        let result = run_epoch(&mut net, &and_data(), 5.0, -1.0).unwrap();
        assert_eq!(result, COST_SKIPPED);
        assert_ne!(net.export_weights(), before);
    }

    #[test]
    fn validate_samples_catches_bad_shapes() {
        let net = Net::new(&[2, 1]);
        assert!(validate_samples(&net, &and_data()).is_ok());
        assert!(validate_samples(&net, &[]).is_err());
        let bad_input = vec![(vec![0.0], vec![0.0])];
        assert!(matches!(
            validate_samples(&net, &bad_input),
            Err(NetError::ShapeMismatch { what: "sample input", .. })
        ));
        let bad_target = vec![(vec![0.0, 0.0], vec![0.0, 1.0])];
        assert!(validate_samples(&net, &bad_target).is_err());
    }
}
