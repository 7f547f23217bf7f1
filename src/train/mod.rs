pub mod abort;
pub mod coordinator;
pub mod epoch;
pub mod restart_stats;
pub mod search_config;
pub mod worker;

pub use abort::AbortHandle;
pub use coordinator::{BestRecord, Search};
pub use epoch::{cost, run_epoch, validate_samples, Sample, COST_SKIPPED};
pub use restart_stats::{RestartEnd, RestartStats};
pub use search_config::SearchConfig;
pub use worker::{cost_change_ratio, is_stagnant, SearchResult, SearchWorker, UNSET_COST};
