use std::sync::mpsc;
use std::time::Instant;

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, trace};

use crate::error::Result;
use crate::network::net::Net;
use crate::train::abort::AbortHandle;
use crate::train::epoch::{run_epoch, Sample};
use crate::train::restart_stats::{RestartEnd, RestartStats};
use crate::train::search_config::SearchConfig;

/// Cost a worker or shared record holds before anything has been measured.
pub const UNSET_COST: f64 = f64::MAX;

/// Best configuration found: summed epoch cost and its flattened weights.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub cost: f64,
    pub weights: Vec<f64>,
}

/// Ratio used by the stagnation check: `max(prev/cur, cur/prev)`.
///
/// Two zero costs count as no change (1). A zero next to a nonzero cost
/// counts as unbounded change.
pub fn cost_change_ratio(prev: f64, cur: f64) -> f64 {
    match (prev == 0.0, cur == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => f64::INFINITY,
        (false, false) => (prev / cur).max(cur / prev),
    }
}

/// True when consecutive costs are within `min_change` of a ratio of 1.
///
/// The bound is inclusive, so equal costs stagnate at `min_change = 0`. A
/// negative `min_change` never stagnates.
pub fn is_stagnant(prev: f64, cur: f64, min_change: f64) -> bool {
    cost_change_ratio(prev, cur) - 1.0 <= min_change
}

/// Runs the restart/epoch loop on a single net.
///
/// Each restart resets the learn rate, then runs epochs, cooling the rate
/// after each. A restart ends on stagnation, rate exhaustion, the epoch
/// cap, or abort. Abort returns from the whole loop; any other ending
/// re-randomizes the weights and starts the next restart.
pub struct SearchWorker<'a> {
    index: usize,
    config: &'a SearchConfig,
    max_restarts: usize,
    abort: AbortHandle,
    progress_tx: Option<mpsc::Sender<RestartStats>>,
    rng: StdRng,
}

impl<'a> SearchWorker<'a> {
    /// Worker `index` gets `max_restarts` restarts. With `config.seed` set,
    /// its restart weights come from `seed + index`.
    pub fn new(index: usize, config: &'a SearchConfig, max_restarts: usize, abort: AbortHandle) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };
        SearchWorker { index, config, max_restarts, abort, progress_tx: None, rng }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<RestartStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Trains `net` in place and returns the worker's own best.
    ///
    /// `on_improve(cost, weights)` runs each time the worker beats its own
    /// best; an error from it stops the worker. On return `net` holds
    /// whatever weights the loop last produced, not necessarily the best.
    pub fn run<F>(&mut self, net: &mut Net, data: &[Sample], mut on_improve: F) -> Result<SearchResult>
    where
        F: FnMut(f64, &[f64]) -> Result<()>,
    {
        let config = self.config;
        let mut best = SearchResult { cost: UNSET_COST, weights: Vec::new() };
        let mut prev_cost = UNSET_COST;

        for restart in 0..self.max_restarts {
            if self.abort.is_aborted() {
                debug!(worker = self.index, restart, "abort seen before restart");
                break;
            }

            let started = Instant::now();
            let mut learn_rate = config.initial_learn_rate;
            let mut epochs = 0;
            let mut last_cost = UNSET_COST;
            let mut end = RestartEnd::EpochLimit;

            for epoch in 0..config.max_epochs_per_restart {
                let cost = run_epoch(net, data, learn_rate, config.error_bar)?;
                epochs = epoch + 1;
                last_cost = cost;
                learn_rate *= config.cooldown_rate;
                trace!(worker = self.index, restart, epoch, cost, learn_rate, "epoch");

                if cost < best.cost {
                    best.cost = cost;
                    best.weights = net.export_weights();
                    on_improve(best.cost, &best.weights)?;
                }

                if epoch != 0 && is_stagnant(prev_cost, cost, config.min_cost_change_rate) {
                    end = RestartEnd::Stagnant;
                    break;
                }
                if learn_rate < config.min_learn_rate {
                    end = RestartEnd::RateExhausted;
                    break;
                }
                if self.abort.is_aborted() {
                    end = RestartEnd::Aborted;
                    break;
                }
                prev_cost = cost;
            }

            debug!(
                worker = self.index,
                restart,
                epochs,
                learn_rate,
                best_cost = best.cost,
                reason = ?end,
                "restart finished"
            );
            self.report(RestartStats {
                worker: self.index,
                restart,
                epochs,
                learn_rate,
                last_cost,
                best_cost: best.cost,
                end,
                elapsed_ms: started.elapsed().as_millis() as u64,
            });

            if end == RestartEnd::Aborted {
                return Ok(best);
            }
            net.randomize_weights_with(&mut self.rng);
        }

        Ok(best)
    }

    fn report(&mut self, stats: RestartStats) {
        let disconnected = match &self.progress_tx {
            Some(tx) => tx.send(stats).is_err(),
            None => false,
        };
        // A dropped receiver just stops the reports.
        if disconnected {
            self.progress_tx = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor() -> Vec<Sample> {
        vec![
            (vec![0.0, 0.0], vec![0.1]),
            (vec![1.0, 0.0], vec![0.9]),
            (vec![0.0, 1.0], vec![0.9]),
            (vec![1.0, 1.0], vec![0.1]),
        ]
    }

    fn seeded_net(seed: u64) -> Net {
        let mut net = Net::new(&[2, 4, 1]);
        net.randomize_weights_with(&mut StdRng::seed_from_u64(seed));
        net
    }

    #[test]
    fn ratio_policy_at_zero() {
        assert_eq!(cost_change_ratio(0.0, 0.0), 1.0);
        assert_eq!(cost_change_ratio(0.0, 0.5), f64::INFINITY);
        assert_eq!(cost_change_ratio(0.5, 0.0), f64::INFINITY);
        assert_eq!(cost_change_ratio(2.0, 1.0), 2.0);
        assert_eq!(cost_change_ratio(1.0, 2.0), 2.0);
        assert_eq!(cost_change_ratio(3.0, 3.0), 1.0);
    }

    #[test]
    fn stagnation_bound_is_inclusive() {
        assert!(is_stagnant(3.0, 3.0, 0.0));
        assert!(is_stagnant(0.0, 0.0, 0.0));
        assert!(is_stagnant(2.0, 1.0, 1.0));
        assert!(!is_stagnant(2.0, 1.0, 0.5));
        assert!(!is_stagnant(0.0, 0.5, 1e9));
        assert!(!is_stagnant(3.0, 3.0, -1.0));
    }

    #[test]
    fn equal_costs_end_restart_as_stagnant() {
        // No learning and no cooling: every epoch costs the same.
        let config = SearchConfig::default()
            .initial_learn_rate(0.0)
            .cooldown_rate(1.0)
            .min_learn_rate(0.0)
            .min_cost_change_rate(0.0)
            .max_epochs_per_restart(50)
            .seed(1);
        let (tx, rx) = mpsc::channel();
        let mut worker = SearchWorker::new(0, &config, 3, AbortHandle::new()).with_progress(tx);
        let mut net = seeded_net(4);
        worker.run(&mut net, &xor(), |_, _| Ok(())).unwrap();
        drop(worker);

        let stats: Vec<RestartStats> = rx.iter().collect();
        assert_eq!(stats.len(), 3);
        for s in &stats {
            assert_eq!(s.end, RestartEnd::Stagnant);
            assert_eq!(s.epochs, 2);
        }
    }

    #[test]
    fn cooling_below_floor_ends_restart() {
        let config = SearchConfig::default()
            .initial_learn_rate(1.0)
            .cooldown_rate(0.5)
            .min_learn_rate(0.2)
            .error_bar(0.0)
            .seed(2);
        let (tx, rx) = mpsc::channel();
        let mut worker = SearchWorker::new(0, &config, 2, AbortHandle::new()).with_progress(tx);
        worker.run(&mut seeded_net(9), &xor(), |_, _| Ok(())).unwrap();
        drop(worker);

        let stats: Vec<RestartStats> = rx.iter().collect();
        assert_eq!(stats.len(), 2);
        // 1.0 -> 0.5 -> 0.25 -> 0.125: below the floor after the third epoch.
        for s in &stats {
            assert_eq!(s.end, RestartEnd::RateExhausted);
            assert_eq!(s.epochs, 3);
            assert_eq!(s.learn_rate, 0.125);
        }
    }

    #[test]
    fn epoch_cap_ends_restart() {
        let config = SearchConfig::default()
            .initial_learn_rate(1.0)
            .cooldown_rate(1.0)
            .min_learn_rate(0.0)
            .min_cost_change_rate(-1.0)
            .max_epochs_per_restart(7)
            .seed(3);
        let (tx, rx) = mpsc::channel();
        let mut worker = SearchWorker::new(0, &config, 1, AbortHandle::new()).with_progress(tx);
        worker.run(&mut seeded_net(1), &xor(), |_, _| Ok(())).unwrap();
        drop(worker);
        let stats: Vec<RestartStats> = rx.iter().collect();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].end, RestartEnd::EpochLimit);
        assert_eq!(stats[0].epochs, 7);
    }

    #[test]
    fn improvements_are_strictly_decreasing_and_match_result() {
        let config = SearchConfig::default()
            .initial_learn_rate(20.0)
            .error_bar(0.0)
            .seed(5);
        let mut seen = Vec::new();
        let mut worker = SearchWorker::new(0, &config, 4, AbortHandle::new());
        let result = worker
            .run(&mut seeded_net(6), &xor(), |cost, weights| {
                seen.push((cost, weights.to_vec()));
                Ok(())
            })
            .unwrap();

        assert!(!seen.is_empty());
        for pair in seen.windows(2) {
            assert!(pair[1].0 < pair[0].0);
        }
        let (last_cost, last_weights) = seen.last().unwrap();
        assert_eq!(result.cost, *last_cost);
        assert_eq!(&result.weights, last_weights);

        let mut check = seeded_net(0);
        check.import_weights(&result.weights).unwrap();
        assert_eq!(check.export_weights(), result.weights);
    }

    #[test]
    fn seeded_workers_are_reproducible() {
        let config = SearchConfig::default().error_bar(0.0).max_epochs_per_restart(20).seed(77);
        let run = || {
            let mut worker = SearchWorker::new(2, &config, 3, AbortHandle::new());
            worker.run(&mut seeded_net(8), &xor(), |_, _| Ok(())).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn preset_abort_runs_no_restart() {
        let config = SearchConfig::default().seed(1);
        let abort = AbortHandle::new();
        abort.abort();
        let mut worker = SearchWorker::new(0, &config, 100, abort);
        let mut net = seeded_net(2);
        let before = net.export_weights();
        let result = worker.run(&mut net, &xor(), |_, _| Ok(())).unwrap();
        assert_eq!(result.cost, UNSET_COST);
        assert!(result.weights.is_empty());
        assert_eq!(net.export_weights(), before);
    }

    #[test]
    fn abort_mid_restart_returns_after_current_epoch() {
        let config = SearchConfig::default()
            .cooldown_rate(1.0)
            .min_learn_rate(0.0)
            .max_epochs_per_restart(1000)
            .seed(4);
        let abort = AbortHandle::new();
        let trigger = abort.clone();
        let (tx, rx) = mpsc::channel();
        let mut worker = SearchWorker::new(0, &config, 1000, abort).with_progress(tx);
        // Abort from the improvement callback on the very first epoch.
        worker
            .run(&mut seeded_net(3), &xor(), |_, _| {
                trigger.abort();
                Ok(())
            })
            .unwrap();
        drop(worker);
        let stats: Vec<RestartStats> = rx.iter().collect();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].end, RestartEnd::Aborted);
        assert_eq!(stats[0].epochs, 1);
    }

    #[test]
    fn callback_error_stops_worker() {
        let config = SearchConfig::default().seed(1);
        let mut worker = SearchWorker::new(0, &config, 10, AbortHandle::new());
        let err = worker
            .run(&mut seeded_net(1), &xor(), |_, _| {
                Err(crate::error::NetError::InvalidConfig("stop".into()))
            })
            .unwrap_err();
        assert!(matches!(err, crate::error::NetError::InvalidConfig(_)));
    }
}
