//! Integration tests for the query pipeline and export encoders

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use paradecast::analysis::{SeverityTier, classify, trend_of};
use paradecast::config::DerivationConfig;
use paradecast::export::{self, ExportFormat};
use paradecast::models::{Location, QuerySettings, WeatherKind};
use paradecast::orchestrator::{QueryOrchestrator, QueryStatus};
use paradecast::provider::{
    FixtureProvider, ProviderReport, ProviderRequest, WeatherProvider,
};
use paradecast::{ParadecastError, Result};

fn nyc() -> Location {
    Location::new(40.71, -74.0, "NYC")
}

fn default_settings() -> QuerySettings {
    QuerySettings {
        date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
        ..QuerySettings::default()
    }
}

fn fixture_orchestrator() -> QueryOrchestrator {
    QueryOrchestrator::new(Box::new(FixtureProvider::new()), DerivationConfig::default())
}

/// Provider whose first fetch parks until released, for supersession tests
struct GatedProvider {
    rain: AtomicU8,
    calls: AtomicUsize,
    release: tokio::sync::Notify,
}

impl GatedProvider {
    fn new(rain: u8) -> Self {
        Self {
            rain: AtomicU8::new(rain),
            calls: AtomicUsize::new(0),
            release: tokio::sync::Notify::new(),
        }
    }
}

#[async_trait]
impl WeatherProvider for GatedProvider {
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderReport> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.release.notified().await;
        }
        Ok(ProviderReport {
            date: request.date.format("%Y-%m-%d").to_string(),
            temperature_c: None,
            rainfall_mm: None,
            probabilities: vec![(WeatherKind::Rain, self.rain.load(Ordering::SeqCst))],
        })
    }
}

/// Provider that can be flipped into a failing state mid-session
struct FlakyProvider {
    failing: Arc<AtomicBool>,
}

#[async_trait]
impl WeatherProvider for FlakyProvider {
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderReport> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ParadecastError::provider("connection reset"));
        }
        Ok(ProviderReport {
            date: request.date.format("%Y-%m-%d").to_string(),
            temperature_c: None,
            rainfall_mm: None,
            probabilities: vec![(WeatherKind::Rain, 73), (WeatherKind::Storm, 25)],
        })
    }
}

#[tokio::test]
async fn nyc_scenario_derives_expected_rain_metric() {
    let orchestrator = fixture_orchestrator();
    orchestrator.select_location(nyc()).unwrap();

    let outcome = orchestrator.run_query(default_settings()).await.unwrap();

    let rain = outcome
        .metrics
        .iter()
        .find(|m| m.kind == WeatherKind::Rain)
        .unwrap();
    assert_eq!(rain.probability, 73);
    assert_eq!(classify(rain.probability), SeverityTier::High);
    assert_eq!(rain.trend, trend_of(&rain.history, 73, 3, 2.0));
    assert_eq!(rain.history.len(), 6);
    assert!(rain.history.iter().all(|&v| v <= 100));

    // Distribution covers the configured horizon with bounded values
    assert_eq!(outcome.distribution.len(), 31);
    assert!(
        outcome
            .distribution
            .iter()
            .all(|p| (0.0..=100.0).contains(&p.value))
    );
}

#[tokio::test]
async fn repeated_runs_are_deterministic() {
    let orchestrator = fixture_orchestrator();
    orchestrator.select_location(nyc()).unwrap();

    let first = orchestrator.run_query(default_settings()).await.unwrap();
    let second = orchestrator.run_query(default_settings()).await.unwrap();

    assert_eq!(first.metrics, second.metrics);
    assert_eq!(first.distribution, second.distribution);
}

#[tokio::test]
async fn disabled_sources_fail_without_touching_state() {
    let orchestrator = fixture_orchestrator();
    orchestrator.select_location(nyc()).unwrap();
    orchestrator.run_query(default_settings()).await.unwrap();
    let before = orchestrator.snapshot();

    let invalid = QuerySettings {
        include_historical: false,
        include_forecast: false,
        ..default_settings()
    };
    let err = orchestrator.run_query(invalid).await.unwrap_err();

    assert!(matches!(err, ParadecastError::InvalidSettings { .. }));
    let after = orchestrator.snapshot();
    assert_eq!(after.status, QueryStatus::Ready);
    assert_eq!(after.metrics, before.metrics);
}

#[tokio::test]
async fn superseding_run_wins_over_stale_one() {
    let provider = Arc::new(GatedProvider::new(40));
    let orchestrator = Arc::new(QueryOrchestrator::new(
        Box::new(ParkedHandle(provider.clone())),
        DerivationConfig::default(),
    ));
    orchestrator.select_location(nyc()).unwrap();

    // First run parks in the provider fetch
    let stale = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run_query(default_settings()).await })
    };
    tokio::task::yield_now().await;

    // Second run supersedes it and publishes
    provider.rain.store(90, Ordering::SeqCst);
    let fresh = orchestrator.run_query(default_settings()).await.unwrap();
    assert!(fresh.published);
    assert_eq!(fresh.metrics[0].probability, 90);

    // Release the stale run; its result must not be applied
    provider.release.notify_one();
    let stale = stale.await.unwrap().unwrap();
    assert!(!stale.published);
    assert_eq!(stale.metrics[0].probability, 40);

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status, QueryStatus::Ready);
    assert_eq!(snapshot.metrics[0].probability, 90);
}

/// Forwards fetches to a shared [`GatedProvider`] so the test can reach it
struct ParkedHandle(Arc<GatedProvider>);

#[async_trait]
impl WeatherProvider for ParkedHandle {
    async fn fetch(&self, request: &ProviderRequest) -> Result<ProviderReport> {
        self.0.fetch(request).await
    }
}

#[tokio::test]
async fn provider_failure_preserves_previous_results() {
    let failing = Arc::new(AtomicBool::new(false));
    let orchestrator = QueryOrchestrator::new(
        Box::new(FlakyProvider {
            failing: failing.clone(),
        }),
        DerivationConfig::default(),
    );
    orchestrator.select_location(nyc()).unwrap();
    let good = orchestrator.run_query(default_settings()).await.unwrap();

    // The provider starts failing; the run surfaces the error as a failed
    // state but the previously published results stay intact
    failing.store(true, Ordering::SeqCst);
    let err = orchestrator.run_query(default_settings()).await.unwrap_err();
    assert!(matches!(err, ParadecastError::ProviderUnavailable { .. }));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.status, QueryStatus::Failed);
    assert_eq!(snapshot.metrics, good.metrics);
    assert_eq!(snapshot.distribution, good.distribution);
}

#[tokio::test]
async fn json_export_round_trips_exactly() {
    let orchestrator = fixture_orchestrator();
    orchestrator.select_location(nyc()).unwrap();
    orchestrator.run_query(default_settings()).await.unwrap();

    let snapshot = orchestrator.export_snapshot().unwrap();
    let blob = export::encode(&snapshot, ExportFormat::Json).unwrap();
    let restored = export::decode_json(&blob.bytes).unwrap();
    assert_eq!(restored, snapshot);
}

#[tokio::test]
async fn csv_export_has_one_row_per_metric() {
    let orchestrator = fixture_orchestrator();
    orchestrator.select_location(nyc()).unwrap();
    orchestrator.run_query(default_settings()).await.unwrap();

    let snapshot = orchestrator.export_snapshot().unwrap();
    let blob = export::encode(&snapshot, ExportFormat::Csv).unwrap();
    let text = String::from_utf8(blob.bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "kind,probability,title,trend");
    assert_eq!(lines.len(), snapshot.metrics.len() + 1);
    assert!(lines.iter().any(|l| l.starts_with("rain,73,")));
}

#[tokio::test]
async fn pdf_export_is_reproducible_across_sessions() {
    let render = || async {
        let orchestrator = fixture_orchestrator();
        orchestrator.select_location(nyc()).unwrap();
        orchestrator.run_query(default_settings()).await.unwrap();
        let snapshot = orchestrator.export_snapshot().unwrap();
        export::encode_detached(snapshot, ExportFormat::Pdf)
            .await
            .unwrap()
    };

    let first = render().await;
    let second = render().await;
    assert_eq!(first.bytes, second.bytes);
    assert!(first.bytes.starts_with(b"%PDF-"));
    assert!(first.bytes.ends_with(b"%%EOF"));
}
