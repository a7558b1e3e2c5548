//! `Paradecast` - Weather-risk probabilities for the date and place you choose
//!
//! This library provides the core functionality for deriving weather-risk
//! metrics, probability distribution curves and sparklines from a location
//! and query settings, plus the export encoders and the HTTP surface.

pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod web;

// Re-export core types for public API
pub use analysis::{SeverityTier, classify, sparkline, synthesize, trend_of};
pub use config::ParadecastConfig;
pub use error::ParadecastError;
pub use export::{ExportBlob, ExportFormat, ExportSnapshot};
pub use models::{DistributionPoint, Location, QuerySettings, Trend, WeatherKind, WeatherMetric};
pub use orchestrator::{QueryOrchestrator, QueryOutcome, QueryStatus};
pub use provider::{FixtureProvider, OpenMeteoProvider, ProviderReport, ProviderRequest, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ParadecastError>;
