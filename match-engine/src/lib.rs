//! Matching and aggregation for freshly ingested supplier items.
//!
//! - [`fuzzy_matcher`] — token-set scoring and the three-way
//!   classification (auto / review / unmatched).
//! - [`reranker`] — optional LLM pass over vector-nearest candidates,
//!   classified by confidence with a fuzzy fallback.
//! - [`pipeline`] — drives candidate selection, classification, and the
//!   database writes for a batch of items.
//! - [`aggregation`] — recomputes `min_price` / `availability` per
//!   product after links change.
//! - [`review`] — lifecycle of the human review queue.

pub mod aggregation;
pub mod errors;
pub mod fuzzy_matcher;
pub mod pipeline;
pub mod reranker;
pub mod review;
pub mod types;

pub use aggregation::AggregationEngine;
pub use errors::MatchError;
pub use pipeline::MatchEngine;
pub use review::ReviewService;
pub use types::{MatchCandidate, MatchConfig, MatchOutcome, MatchStats};
