use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{NetError, Result};

/// Hyperparameters for a multi-restart search.
///
/// Serializable so a run's settings can be stored next to the `NetSpec` it
/// trained. Per-run plumbing (progress channel, abort handle) lives on
/// `Search` instead.
///
/// # Fields
/// - `initial_learn_rate`    : learn rate at the start of every restart
/// - `cooldown_rate`         : multiplied into the learn rate after each epoch, in `(0, 1]`
/// - `max_restarts`          : total restart budget, split evenly across workers
/// - `max_epochs_per_restart`: epoch cap for a single restart
/// - `error_bar`             : dead-zone width for the cost; negative skips cost tracking
/// - `min_cost_change_rate`  : a restart ends once the ratio of consecutive epoch costs is
///                           within this of 1 (inclusive); negative disables the check
/// - `min_learn_rate`        : a restart ends once the learn rate falls below this
/// - `num_workers`           : parallel workers, each training its own copy of the net
/// - `seed`                  : if set, worker `i` draws restart weights from `seed + i`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub initial_learn_rate: f64,
    pub cooldown_rate: f64,
    pub max_restarts: usize,
    pub max_epochs_per_restart: usize,
    pub error_bar: f64,
    pub min_cost_change_rate: f64,
    pub min_learn_rate: f64,
    pub num_workers: usize,
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            initial_learn_rate: 10.0,
            cooldown_rate: 0.998,
            max_restarts: usize::MAX,
            max_epochs_per_restart: 200,
            error_bar: 0.1,
            min_cost_change_rate: 0.0,
            min_learn_rate: 0.1,
            num_workers: 8,
            seed: None,
        }
    }
}

impl SearchConfig {
    pub fn initial_learn_rate(mut self, rate: f64) -> Self {
        self.initial_learn_rate = rate;
        self
    }

    pub fn cooldown_rate(mut self, rate: f64) -> Self {
        self.cooldown_rate = rate;
        self
    }

    pub fn max_restarts(mut self, restarts: usize) -> Self {
        self.max_restarts = restarts;
        self
    }

    pub fn max_epochs_per_restart(mut self, epochs: usize) -> Self {
        self.max_epochs_per_restart = epochs;
        self
    }

    pub fn error_bar(mut self, error_bar: f64) -> Self {
        self.error_bar = error_bar;
        self
    }

    pub fn min_cost_change_rate(mut self, rate: f64) -> Self {
        self.min_cost_change_rate = rate;
        self
    }

    pub fn min_learn_rate(mut self, rate: f64) -> Self {
        self.min_learn_rate = rate;
        self
    }

    pub fn num_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(NetError::InvalidConfig("num_workers must be at least 1".into()));
        }
        if self.max_restarts == 0 {
            return Err(NetError::InvalidConfig("max_restarts must be at least 1".into()));
        }
        if self.max_epochs_per_restart == 0 {
            return Err(NetError::InvalidConfig("max_epochs_per_restart must be at least 1".into()));
        }
        if !(self.cooldown_rate > 0.0 && self.cooldown_rate <= 1.0) {
            return Err(NetError::InvalidConfig(format!(
                "cooldown_rate {} must lie in (0, 1]",
                self.cooldown_rate
            )));
        }
        if !self.initial_learn_rate.is_finite() {
            return Err(NetError::InvalidConfig("initial_learn_rate must be finite".into()));
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<SearchConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
