//! Data models for the Paradecast application
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and metadata
//! - Settings: Query settings captured from the controls surface
//! - Metric: Derived weather-risk metrics and trends
//! - Chart: Point types for the distribution curve and sparklines

pub mod chart;
pub mod location;
pub mod metric;
pub mod settings;

// Re-export all public types for convenient access
pub use chart::{DistributionPoint, SparklinePoint};
pub use location::Location;
pub use metric::{Trend, WeatherKind, WeatherMetric};
pub use settings::{EventType, QuerySettings};
