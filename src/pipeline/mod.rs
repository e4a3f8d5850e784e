//! Fetch, normalize, cache, and query pipeline.
//!
//! - `normalize`: raw record to canonical module
//! - `cache`: content-addressed LRU of observations
//! - `scheduler`: single-flight refresh and atomic publish
//! - `query`: read-only views over a published collection

pub mod cache;
pub mod normalize;
pub mod query;
pub mod scheduler;

pub use cache::{ContentCache, ContentFingerprint, InsertOutcome};
pub use normalize::{Normalizer, normalize_tags};
pub use query::{Query, QueryResult, all, all_tags, by_tag, dispatch, latest};
pub use scheduler::{CycleStats, RefreshScheduler, RefreshState, Snapshot};
