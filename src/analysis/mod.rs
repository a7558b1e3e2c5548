//! Derivation pipeline
//!
//! This module holds the pure, synchronous math of the pipeline:
//! - Classifier: severity tiers and trend classification
//! - Distribution: parametric bell-curve synthesis for the chart
//! - Sparkline: normalized per-metric trend sequences
//! - History: deterministic per-(location, date, kind) history windows
//!
//! Nothing here performs I/O or suspends; every function is total over its
//! valid inputs and deterministic, which keeps re-renders and re-derivations
//! safe.

pub mod classifier;
pub mod distribution;
pub mod history;
pub mod sparkline;

// Re-export commonly used items
pub use classifier::{SeverityTier, classify, trend_of};
pub use distribution::{DistributionParams, synthesize};
pub use history::{HistoryParams, derive_history};
pub use sparkline::sparkline;
