use serde::{Serialize, Deserialize};

/// Why a restart stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartEnd {
    /// The ratio of consecutive epoch costs came within `min_cost_change_rate` of 1.
    Stagnant,
    /// The learn rate cooled below `min_learn_rate`.
    RateExhausted,
    /// `max_epochs_per_restart` epochs ran.
    EpochLimit,
    /// The abort flag was seen; the worker returns without restarting.
    Aborted,
}

/// Summary of one finished restart.
///
/// When `Search::with_progress` is used, each worker sends one of these at
/// the end of every restart. Receivers may be dropped at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartStats {
    /// Index of the worker that ran the restart.
    pub worker: usize,
    /// 0-based restart number within that worker.
    pub restart: usize,
    /// Epochs completed in this restart.
    pub epochs: usize,
    /// Learn rate after the last epoch's cooldown.
    pub learn_rate: f64,
    /// Cost of the last epoch.
    pub last_cost: f64,
    /// Worker's best cost so far, across all its restarts.
    pub best_cost: f64,
    pub end: RestartEnd,
    /// Wall-clock duration of the restart in milliseconds.
    pub elapsed_ms: u64,
}
