use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::network::net::Net;
use crate::train::abort::AbortHandle;
use crate::train::epoch::{validate_samples, Sample};
use crate::train::restart_stats::RestartStats;
use crate::train::search_config::SearchConfig;
use crate::train::worker::{SearchResult, SearchWorker, UNSET_COST};

// ---------------------------------------------------------------------------
// Shared best record
// ---------------------------------------------------------------------------

struct BestState {
    cost: f64,
    weights: Vec<f64>,
    /// Copy of the caller's net carrying the best weights, handed to the
    /// monitor.
    net: Net,
}

/// Best configuration across all workers.
///
/// The cost is mirrored in an atomic so workers can skip the lock when they
/// are clearly not better. Updates are double-checked under the lock, so the
/// recorded cost never increases.
pub struct BestRecord {
    cost_bits: AtomicU64,
    state: Mutex<BestState>,
}

impl BestRecord {
    pub fn new(net: Net) -> BestRecord {
        BestRecord {
            cost_bits: AtomicU64::new(UNSET_COST.to_bits()),
            state: Mutex::new(BestState { cost: UNSET_COST, weights: Vec::new(), net }),
        }
    }

    /// Current best cost, read without locking.
    pub fn cost(&self) -> f64 {
        f64::from_bits(self.cost_bits.load(Ordering::Acquire))
    }

    /// Records `(cost, weights)` if it beats the current best, then calls
    /// `monitor` with the updated net while the lock is still held.
    ///
    /// `monitor` must be quick and must not call back into the search.
    /// Returns whether the record changed.
    pub fn offer<M>(&self, cost: f64, weights: &[f64], monitor: &M) -> Result<bool>
    where
        M: Fn(f64, &Net),
    {
        if cost.is_nan() || cost >= self.cost() {
            return Ok(false);
        }
        // The record is only ever replaced whole, so a poisoned lock still
        // holds a consistent value.
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if cost >= state.cost {
            return Ok(false);
        }
        state.net.import_weights(weights)?;
        state.cost = cost;
        state.weights = weights.to_vec();
        self.cost_bits.store(cost.to_bits(), Ordering::Release);
        debug!(cost, fingerprint = state.net.fingerprint(), "shared best improved");
        monitor(cost, &state.net);
        Ok(true)
    }

    /// The current best cost and weights. Weights are empty until the first
    /// successful `offer`.
    pub fn snapshot(&self) -> SearchResult {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        SearchResult { cost: state.cost, weights: state.weights.clone() }
    }
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Parallel multi-restart search.
///
/// `run` splits `max_restarts` evenly over `num_workers` threads. Each
/// thread trains its own deep copy of the net and offers improvements to a
/// shared `BestRecord`. The search stops when every worker has used its
/// restarts or after an `abort`.
pub struct Search {
    config: SearchConfig,
    abort: AbortHandle,
    progress_tx: Option<mpsc::Sender<RestartStats>>,
}

impl Search {
    pub fn new(config: SearchConfig) -> Search {
        Search { config, abort: AbortHandle::new(), progress_tx: None }
    }

    /// Every worker sends a `RestartStats` on this channel after each
    /// restart.
    pub fn with_progress(mut self, tx: mpsc::Sender<RestartStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Handle that can stop a running search from another thread or from
    /// the monitor.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Stops the running search. An abort issued before `run` starts is
    /// discarded, since `run` clears the flag on entry.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Searches for low-cost weights for `net` on `data`.
    ///
    /// `monitor(cost, net)` is called under the shared lock each time the
    /// shared best strictly improves; `net` there is a copy holding the new
    /// best weights. When the search ends, the caller's `net` is loaded with
    /// the best weights found and those are returned. If nothing was ever
    /// recorded (abort before the first epoch), `net` is left as is and its
    /// own weights are returned with `UNSET_COST`.
    ///
    /// The abort flag is cleared when `run` starts.
    pub fn run<M>(&self, net: &mut Net, data: &[Sample], monitor: M) -> Result<SearchResult>
    where
        M: Fn(f64, &Net) + Sync,
    {
        self.abort.reset();
        self.config.validate()?;
        validate_samples(net, data)?;

        let config = &self.config;
        let workers = config.num_workers.min(config.max_restarts);
        let restarts_per_worker = config.max_restarts / workers;
        let started = Instant::now();
        info!(
            workers,
            restarts_per_worker,
            samples = data.len(),
            connections = net.connection_count(),
            fingerprint = net.fingerprint(),
            "starting minima search"
        );

        let record = BestRecord::new(net.clone());
        let copies: Vec<Net> = (0..workers).map(|_| net.clone()).collect();

        let outcomes: Vec<Result<SearchResult>> = thread::scope(|scope| {
            let handles: Vec<_> = copies
                .into_iter()
                .enumerate()
                .map(|(index, mut copy)| {
                    let record = &record;
                    let monitor = &monitor;
                    let abort = self.abort.clone();
                    let progress_tx = self.progress_tx.clone();
                    scope.spawn(move || {
                        let mut worker = SearchWorker::new(index, config, restarts_per_worker, abort);
                        if let Some(tx) = progress_tx {
                            worker = worker.with_progress(tx);
                        }
                        worker.run(&mut copy, data, |cost, weights| {
                            record.offer(cost, weights, monitor).map(|_| ())
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        for (index, outcome) in outcomes.iter().enumerate() {
            if let Ok(own) = outcome {
                debug!(worker = index, cost = own.cost, "worker finished");
            }
        }
        outcomes.into_iter().collect::<Result<Vec<_>>>()?;

        let best = record.snapshot();
        let result = if best.weights.is_empty() {
            SearchResult { cost: best.cost, weights: net.export_weights() }
        } else {
            net.import_weights(&best.weights)?;
            best
        };
        info!(
            cost = result.cost,
            aborted = self.abort.is_aborted(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "minima search finished"
        );
        Ok(result)
    }
}
