//! Export encoding for query results
//!
//! Serializes a snapshot of the session into CSV, JSON or PDF bytes. Encoding
//! never mutates the snapshot, and every encode writes a fresh private
//! buffer, so concurrent or abandoned encodes cannot corrupt one another.
//! Given an identical snapshot (and renderer version, for PDF) the output is
//! byte-deterministic.

use crate::models::{DistributionPoint, Location, QuerySettings, WeatherMetric};
use crate::report;
use crate::{ParadecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Output format for an export
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Pdf,
}

impl ExportFormat {
    /// MIME type of the encoded bytes
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    /// Download filename for the encoded bytes
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            ExportFormat::Csv => "weather-report.csv",
            ExportFormat::Json => "weather-report.json",
            ExportFormat::Pdf => "weather-report.pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Pdf => write!(f, "pdf"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ParadecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ParadecastError::invalid_settings(format!(
                "unknown export format '{other}', expected csv, json or pdf"
            ))),
        }
    }
}

/// Immutable snapshot of the session handed to the encoder
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ExportSnapshot {
    pub location: Location,
    pub settings: QuerySettings,
    pub metrics: Vec<WeatherMetric>,
    pub distribution: Vec<DistributionPoint>,
}

/// Encoded export with its transport metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ExportBlob {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: &'static str,
}

/// Encode a snapshot into the requested format
#[instrument(skip(snapshot), fields(metrics = snapshot.metrics.len()))]
pub fn encode(snapshot: &ExportSnapshot, format: ExportFormat) -> Result<ExportBlob> {
    let bytes = match format {
        ExportFormat::Csv => encode_csv(snapshot)?,
        ExportFormat::Json => encode_json(snapshot)?,
        ExportFormat::Pdf => report::render_pdf(snapshot)?,
    };
    debug!(size = bytes.len(), "Export encoded");
    Ok(ExportBlob {
        bytes,
        content_type: format.content_type(),
        filename: format.filename(),
    })
}

/// Encode on the blocking pool, owning a private copy of the snapshot
///
/// PDF rendering is the one non-trivial encode; detaching it means a caller
/// abandoning the returned future leaves no shared buffer behind.
pub async fn encode_detached(snapshot: ExportSnapshot, format: ExportFormat) -> Result<ExportBlob> {
    tokio::task::spawn_blocking(move || encode(&snapshot, format))
        .await
        .map_err(|e| ParadecastError::encode(format!("Encode task failed: {e}")))?
}

/// Restore a snapshot from its JSON encoding
pub fn decode_json(bytes: &[u8]) -> Result<ExportSnapshot> {
    serde_json::from_slice(bytes)
        .map_err(|e| ParadecastError::encode(format!("Failed to decode JSON export: {e}")))
}

fn encode_csv(snapshot: &ExportSnapshot) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["kind", "probability", "title", "trend"])
        .map_err(|e| ParadecastError::encode(format!("CSV header failed: {e}")))?;

    for metric in &snapshot.metrics {
        writer
            .write_record([
                metric.kind.to_string(),
                metric.probability.to_string(),
                metric.title.clone(),
                metric.trend.to_string(),
            ])
            .map_err(|e| ParadecastError::encode(format!("CSV row failed: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| ParadecastError::encode(format!("CSV flush failed: {e}")))
}

fn encode_json(snapshot: &ExportSnapshot) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(snapshot)
        .map_err(|e| ParadecastError::encode(format!("JSON encode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trend, WeatherKind};
    use chrono::NaiveDate;

    fn create_test_snapshot() -> ExportSnapshot {
        ExportSnapshot {
            location: Location::new(40.71, -74.0, "NYC"),
            settings: QuerySettings {
                date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
                ..QuerySettings::default()
            },
            metrics: vec![
                WeatherMetric {
                    kind: WeatherKind::Rain,
                    probability: 73,
                    title: WeatherKind::Rain.title().to_string(),
                    description: WeatherKind::Rain.description().to_string(),
                    trend: Trend::Up,
                    history: vec![45, 52, 48, 61, 55, 67],
                },
                WeatherMetric {
                    kind: WeatherKind::Storm,
                    probability: 25,
                    title: WeatherKind::Storm.title().to_string(),
                    description: WeatherKind::Storm.description().to_string(),
                    trend: Trend::Down,
                    history: vec![30, 33, 28, 35, 31, 29],
                },
            ],
            distribution: vec![
                DistributionPoint {
                    position: 0.0,
                    value: 13.5,
                },
                DistributionPoint {
                    position: 50.0,
                    value: 86.5,
                },
                DistributionPoint {
                    position: 100.0,
                    value: 13.5,
                },
            ],
        }
    }

    #[test]
    fn test_csv_header_and_rows() {
        let blob = encode(&create_test_snapshot(), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(blob.bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "kind,probability,title,trend");
        assert_eq!(lines[1], "rain,73,Rain Probability,up");
        assert_eq!(lines[2], "storm,25,Storm Risk,down");
        assert_eq!(lines.len(), 3);
        assert_eq!(blob.content_type, "text/csv");
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = create_test_snapshot();
        let blob = encode(&snapshot, ExportFormat::Json).unwrap();
        let restored = decode_json(&blob.bytes).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_json_shape_is_stable() {
        let blob = encode(&create_test_snapshot(), ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&blob.bytes).unwrap();
        assert!(value.get("location").is_some());
        assert!(value.get("settings").is_some());
        assert_eq!(value["metrics"][0]["kind"], "rain");
        assert_eq!(value["metrics"][0]["probability"], 73);
        assert_eq!(value["distribution"][1]["position"], 50.0);
    }

    #[test]
    fn test_encode_does_not_mutate_snapshot() {
        let snapshot = create_test_snapshot();
        let before = snapshot.clone();
        let _ = encode(&snapshot, ExportFormat::Csv).unwrap();
        let _ = encode(&snapshot, ExportFormat::Json).unwrap();
        let _ = encode(&snapshot, ExportFormat::Pdf).unwrap();
        assert_eq!(snapshot, before);
    }

    #[tokio::test]
    async fn test_detached_encode_matches_inline() {
        let snapshot = create_test_snapshot();
        let inline = encode(&snapshot, ExportFormat::Pdf).unwrap();
        let detached = encode_detached(snapshot, ExportFormat::Pdf).await.unwrap();
        assert_eq!(inline, detached);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
