//! Query orchestration
//!
//! The orchestrator owns the session tuple `{settings, location, metrics,
//! distribution}` and drives a query run through validate → fetch → derive →
//! publish. Derivation is pure and synchronous; the provider fetch is the only
//! suspension point. Runs are sequenced with a monotonically increasing
//! submission number and published last-write-wins: a newer submission
//! supersedes an in-flight one, whose result is discarded on arrival. A
//! superseded or failed run never overwrites previously published results.

use crate::analysis::{derive_history, synthesize, trend_of};
use crate::export::ExportSnapshot;
use crate::models::{DistributionPoint, Location, QuerySettings, WeatherMetric};
use crate::provider::{ProviderRequest, WeatherProvider};
use crate::{ParadecastError, Result, config::DerivationConfig};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

/// Lifecycle of the current query session
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Running,
    Ready,
    Failed,
}

/// Result of one query run
///
/// The caller always receives its own outcome; `published` records whether it
/// also became the shared session state (false when a newer run superseded
/// this one before it resolved).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Submission sequence number of this run
    pub sequence: u64,
    /// Whether this run's result was applied to shared state
    pub published: bool,
    /// Settings captured at submission time
    pub settings: QuerySettings,
    /// Location captured at submission time
    pub location: Location,
    /// Derived metrics, one per reported kind
    pub metrics: Vec<WeatherMetric>,
    /// Synthesized distribution curve
    pub distribution: Vec<DistributionPoint>,
    /// Peak probability across the metrics
    pub peak: u8,
    /// Mean probability across the metrics
    pub average: u8,
}

/// Read-only snapshot of the shared session state
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResultsSnapshot {
    pub status: QueryStatus,
    pub location: Option<Location>,
    pub settings: QuerySettings,
    pub metrics: Vec<WeatherMetric>,
    pub distribution: Vec<DistributionPoint>,
}

#[derive(Debug)]
struct SharedState {
    status: QueryStatus,
    location: Option<Location>,
    settings: QuerySettings,
    metrics: Vec<WeatherMetric>,
    distribution: Vec<DistributionPoint>,
}

impl SharedState {
    fn initial() -> Self {
        Self {
            status: QueryStatus::Idle,
            location: None,
            settings: QuerySettings::default(),
            metrics: Vec::new(),
            distribution: Vec::new(),
        }
    }
}

/// Owns the session state and drives query runs
pub struct QueryOrchestrator {
    provider: Box<dyn WeatherProvider>,
    derivation: DerivationConfig,
    state: Mutex<SharedState>,
    /// Highest submission number handed out; a run is current while its own
    /// number still equals this
    issued: AtomicU64,
}

impl QueryOrchestrator {
    /// Create an orchestrator over a provider with derivation tunables
    #[must_use]
    pub fn new(provider: Box<dyn WeatherProvider>, derivation: DerivationConfig) -> Self {
        Self {
            provider,
            derivation,
            state: Mutex::new(SharedState::initial()),
            issued: AtomicU64::new(0),
        }
    }

    /// Select or replace the session location
    pub fn select_location(&self, location: Location) -> Result<()> {
        location.validate()?;
        info!(name = %location.name, "Location selected");
        self.lock_state().location = Some(location);
        Ok(())
    }

    /// Run a query with the given settings against the current location
    ///
    /// Validation happens synchronously before the fetch. The captured
    /// settings/location pair is immutable for the rest of the run and only
    /// enters shared state alongside the metrics it produced, so snapshots
    /// never pair metrics with settings from a different run.
    #[instrument(skip(self, settings), fields(date = %settings.date, sequence = tracing::field::Empty))]
    pub async fn run_query(&self, settings: QuerySettings) -> Result<QueryOutcome> {
        settings.validate()?;

        // Capture location + sequence and mark the session running
        let (location, sequence) = {
            let mut state = self.lock_state();
            let location = state
                .location
                .clone()
                .ok_or(ParadecastError::NoLocationSelected)?;
            let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            state.status = QueryStatus::Running;
            (location, sequence)
        };
        tracing::Span::current().record("sequence", sequence);

        let request = ProviderRequest::from_settings(&settings, &location);
        let report = match self.provider.fetch(&request).await {
            Ok(report) => report,
            Err(err) => {
                // Prior successful results stay intact on failure
                let mut state = self.lock_state();
                if sequence == self.issued.load(Ordering::SeqCst) {
                    state.status = QueryStatus::Failed;
                }
                warn!(error = %err, "Provider fetch failed");
                return Err(err);
            }
        };

        if report.probabilities.is_empty() {
            let mut state = self.lock_state();
            if sequence == self.issued.load(Ordering::SeqCst) {
                state.status = QueryStatus::Failed;
            }
            return Err(ParadecastError::provider("Provider reported no metrics"));
        }

        let outcome = self.derive(sequence, settings, location, &report);

        // Publish only if no newer run was issued while this one was in flight
        let published = {
            let mut state = self.lock_state();
            if sequence == self.issued.load(Ordering::SeqCst) {
                state.status = QueryStatus::Ready;
                state.settings = outcome.settings.clone();
                state.location = Some(outcome.location.clone());
                state.metrics = outcome.metrics.clone();
                state.distribution = outcome.distribution.clone();
                true
            } else {
                debug!("Run superseded; result discarded");
                false
            }
        };

        info!(
            published,
            metrics = outcome.metrics.len(),
            peak = outcome.peak,
            "Query run complete"
        );
        Ok(QueryOutcome {
            published,
            ..outcome
        })
    }

    /// Abandon any in-flight run; its result will not be applied
    pub fn cancel_pending(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        if state.status == QueryStatus::Running {
            state.status = if state.metrics.is_empty() {
                QueryStatus::Idle
            } else {
                QueryStatus::Ready
            };
        }
    }

    /// Clear derived results and return to the initial view
    pub fn reset(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        *state = SharedState::initial();
        info!("Session reset");
    }

    /// Read-only snapshot of the current session
    #[must_use]
    pub fn snapshot(&self) -> ResultsSnapshot {
        let state = self.lock_state();
        ResultsSnapshot {
            status: state.status,
            location: state.location.clone(),
            settings: state.settings.clone(),
            metrics: state.metrics.clone(),
            distribution: state.distribution.clone(),
        }
    }

    /// Snapshot for the export encoder; requires published results
    pub fn export_snapshot(&self) -> Result<ExportSnapshot> {
        let state = self.lock_state();
        let location = state
            .location
            .clone()
            .ok_or(ParadecastError::NoLocationSelected)?;
        if state.metrics.is_empty() {
            return Err(ParadecastError::invalid_settings(
                "no query results to export; run a query first",
            ));
        }
        Ok(ExportSnapshot {
            location,
            settings: state.settings.clone(),
            metrics: state.metrics.clone(),
            distribution: state.distribution.clone(),
        })
    }

    /// Pure derivation of one report into an outcome; no suspension inside
    fn derive(
        &self,
        sequence: u64,
        settings: QuerySettings,
        location: Location,
        report: &crate::provider::ProviderReport,
    ) -> QueryOutcome {
        let history_params = self.derivation.history_params();

        let metrics: Vec<WeatherMetric> = report
            .probabilities
            .iter()
            .map(|&(kind, probability)| {
                let probability = probability.min(100);
                let history =
                    derive_history(&location, settings.date, kind, probability, &history_params);
                let trend = trend_of(
                    &history,
                    probability,
                    self.derivation.trend_window,
                    self.derivation.trend_epsilon,
                );
                WeatherMetric {
                    kind,
                    probability,
                    title: kind.title().to_string(),
                    description: kind.description().to_string(),
                    trend,
                    history,
                }
            })
            .collect();

        let peak = metrics.iter().map(|m| m.probability).max().unwrap_or(0);
        let sum: u32 = metrics.iter().map(|m| u32::from(m.probability)).sum();
        let average = u8::try_from(sum / metrics.len().max(1) as u32).unwrap_or(100);

        let distribution = synthesize(peak, average, &self.derivation.distribution_params());

        QueryOutcome {
            sequence,
            published: false,
            settings,
            location,
            metrics,
            distribution,
            peak,
            average,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SharedState> {
        // Poisoning only matters if a holder panicked; the state is still
        // consistent because every mutation is a whole-field replacement
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SeverityTier, classify};
    use crate::models::WeatherKind;
    use crate::provider::FixtureProvider;

    fn orchestrator() -> QueryOrchestrator {
        QueryOrchestrator::new(Box::new(FixtureProvider::new()), DerivationConfig::default())
    }

    fn nyc() -> Location {
        Location::new(40.71, -74.0, "NYC")
    }

    #[tokio::test]
    async fn test_run_query_without_location_fails() {
        let orchestrator = orchestrator();
        let err = orchestrator
            .run_query(QuerySettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ParadecastError::NoLocationSelected));
        assert_eq!(orchestrator.snapshot().status, QueryStatus::Idle);
    }

    #[tokio::test]
    async fn test_run_query_derives_and_publishes() {
        let orchestrator = orchestrator();
        orchestrator.select_location(nyc()).unwrap();

        let outcome = orchestrator
            .run_query(QuerySettings::default())
            .await
            .unwrap();

        assert!(outcome.published);
        assert_eq!(outcome.metrics.len(), 4);
        assert_eq!(outcome.peak, 82);
        assert_eq!(outcome.distribution.len(), 31);

        let rain = outcome
            .metrics
            .iter()
            .find(|m| m.kind == WeatherKind::Rain)
            .unwrap();
        assert_eq!(rain.probability, 73);
        assert_eq!(rain.title, "Rain Probability");
        assert_eq!(classify(rain.probability), SeverityTier::High);
        assert_eq!(rain.history.len(), 6);

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.status, QueryStatus::Ready);
        assert_eq!(snapshot.metrics, outcome.metrics);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_before_derivation() {
        let orchestrator = orchestrator();
        orchestrator.select_location(nyc()).unwrap();
        let settings = QuerySettings {
            include_historical: false,
            include_forecast: false,
            ..QuerySettings::default()
        };

        let err = orchestrator.run_query(settings).await.unwrap_err();
        assert!(matches!(err, ParadecastError::InvalidSettings { .. }));
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.status, QueryStatus::Idle);
        assert!(snapshot.metrics.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_results() {
        let orchestrator = orchestrator();
        orchestrator.select_location(nyc()).unwrap();
        orchestrator
            .run_query(QuerySettings::default())
            .await
            .unwrap();

        orchestrator.reset();
        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.status, QueryStatus::Idle);
        assert!(snapshot.location.is_none());
        assert!(snapshot.metrics.is_empty());
        assert!(snapshot.distribution.is_empty());
    }

    #[tokio::test]
    async fn test_export_snapshot_requires_results() {
        let orchestrator = orchestrator();
        assert!(orchestrator.export_snapshot().is_err());

        orchestrator.select_location(nyc()).unwrap();
        assert!(orchestrator.export_snapshot().is_err());

        orchestrator
            .run_query(QuerySettings::default())
            .await
            .unwrap();
        let snapshot = orchestrator.export_snapshot().unwrap();
        assert_eq!(snapshot.metrics.len(), 4);
    }

    #[tokio::test]
    async fn test_published_settings_come_from_the_run_itself() {
        let orchestrator = orchestrator();
        orchestrator.select_location(nyc()).unwrap();
        let settings = QuerySettings {
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            precipitation_threshold: 80,
            ..QuerySettings::default()
        };

        orchestrator.run_query(settings.clone()).await.unwrap();

        assert_eq!(orchestrator.snapshot().settings, settings);
        let export = orchestrator.export_snapshot().unwrap();
        assert_eq!(export.settings, settings);
    }

    #[tokio::test]
    async fn test_rejected_run_does_not_replace_published_settings() {
        let orchestrator = orchestrator();
        orchestrator.select_location(nyc()).unwrap();
        let published = QuerySettings::default();
        orchestrator.run_query(published.clone()).await.unwrap();

        let invalid = QuerySettings {
            include_historical: false,
            include_forecast: false,
            ..QuerySettings::default()
        };
        let err = orchestrator.run_query(invalid).await.unwrap_err();
        assert!(matches!(err, ParadecastError::InvalidSettings { .. }));

        let export = orchestrator.export_snapshot().unwrap();
        assert_eq!(export.settings, published);
        assert!(export.settings.include_historical);
        assert!(export.settings.include_forecast);
        assert_eq!(export.metrics.len(), 4);
    }

    #[tokio::test]
    async fn test_reruns_replace_not_merge() {
        let orchestrator = QueryOrchestrator::new(
            Box::new(FixtureProvider::with_probabilities(vec![(
                WeatherKind::Rain,
                40,
            )])),
            DerivationConfig::default(),
        );
        orchestrator.select_location(nyc()).unwrap();

        orchestrator
            .run_query(QuerySettings::default())
            .await
            .unwrap();
        orchestrator
            .run_query(QuerySettings::default())
            .await
            .unwrap();

        let snapshot = orchestrator.snapshot();
        assert_eq!(snapshot.metrics.len(), 1);
    }
}
