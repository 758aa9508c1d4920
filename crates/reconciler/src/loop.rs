//! Continuous status loop.
//!
//! Each cycle waits on the rate limiter, enumerates scopes, lists the
//! resources of every scope and reconciles each one against the live state
//! of its release. Enumeration failures stop the loop; lookup and patch
//! failures only skip the resource they concern.

use std::sync::Arc;
use std::time::Duration;

use annotator_core::{AnnotatorConfig, Error, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::provider::{
    DefaultReleaseNamer, ReleaseNamer, ReleaseStateFetcher, ResourceLister, ScopeEnumerator,
    StatusPatcher,
};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::reconciler::{StatusReconciler, bounded};
use crate::types::{CycleReport, CycleTotals, LoopOutcome, LoopState, StopReason};

/// Configuration for the status loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// How often a cycle may start.
    pub limiter: RateLimitConfig,
    /// Upper bound for each store and release manager call.
    pub call_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            limiter: RateLimitConfig::default(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl TryFrom<&AnnotatorConfig> for LoopConfig {
    type Error = Error;

    fn try_from(config: &AnnotatorConfig) -> Result<Self> {
        if config.timeouts.call_timeout.is_zero() {
            return Err(Error::invalid_config("call timeout must be positive"));
        }
        Ok(Self {
            limiter: RateLimitConfig::try_from(&config.limiter)?,
            call_timeout: config.timeouts.call_timeout,
        })
    }
}

/// Drives reconciliation cycles until stopped.
pub struct LoopController {
    limiter: RateLimiter,
    scopes: Arc<dyn ScopeEnumerator>,
    resources: Arc<dyn ResourceLister>,
    releases: Arc<dyn ReleaseStateFetcher>,
    namer: Arc<dyn ReleaseNamer>,
    reconciler: StatusReconciler,
    call_timeout: Duration,
    state: LoopState,
    stop_reason: Option<StopReason>,
    totals: CycleTotals,
    /// Stop signal receiver.
    stop_rx: watch::Receiver<bool>,
    /// Stop signal sender (for external control).
    stop_tx: watch::Sender<bool>,
}

impl LoopController {
    /// Start building a controller.
    #[must_use]
    pub fn builder() -> LoopControllerBuilder {
        LoopControllerBuilder::default()
    }

    /// Run cycles until the stop signal is seen or a fatal failure occurs.
    ///
    /// The stop signal is checked at the top of every cycle and while
    /// waiting on the rate limiter; a cycle already in progress finishes
    /// its blocking calls first. Calling `run` on a stopped controller
    /// returns the recorded outcome without doing any work.
    pub async fn run(&mut self) -> LoopOutcome {
        if let Some(reason) = &self.stop_reason {
            return LoopOutcome {
                reason: reason.clone(),
                totals: self.totals.clone(),
            };
        }

        info!(
            interval_ms = self.limiter.config().interval().as_millis(),
            burst = self.limiter.config().burst(),
            call_timeout_ms = self.call_timeout.as_millis(),
            "Starting status loop"
        );

        let reason = loop {
            if *self.stop_rx.borrow() {
                break StopReason::Requested;
            }

            if let Err(e) = self.limiter.wait(&mut self.stop_rx).await {
                break StopReason::Failed(e.into());
            }

            match self.run_cycle().await {
                Ok(report) => {
                    self.totals.absorb(&report);
                    debug!(
                        cycle = self.totals.cycles,
                        scopes = report.scopes,
                        resources = report.resources,
                        patched = report.patched,
                        in_sync = report.in_sync,
                        lookup_failures = report.lookup_failures,
                        patch_failures = report.patch_failures,
                        converged = report.converged(),
                        "Cycle complete"
                    );
                }
                Err(e) => break StopReason::Failed(e),
            }
        };

        self.finish(reason)
    }

    /// Sweep every scope and resource once.
    ///
    /// # Errors
    ///
    /// Returns the first scope or resource listing failure. Lookup and patch
    /// failures are logged, counted in the report and never returned.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::start();

        let scopes = bounded(self.call_timeout, self.scopes.list_scopes(), |reason| {
            Error::scope_list_failed(reason)
        })
        .await?;
        report.scopes = scopes.len();

        for scope in &scopes {
            let resources = bounded(
                self.call_timeout,
                self.resources.list_resources(scope),
                |reason| Error::resource_list_failed(scope, reason),
            )
            .await?;
            report.resources = report.resources.saturating_add(resources.len());

            for resource in &resources {
                let release = self.namer.release_name(resource);
                let fetched = bounded(
                    self.call_timeout,
                    self.releases.fetch_state(resource.scope(), &release),
                    |reason| Error::lookup_failed(release.as_str(), reason),
                )
                .await;

                let state = match fetched {
                    Ok(state) => state,
                    Err(e) => {
                        warn!(
                            scope = scope.as_str(),
                            resource = resource.name(),
                            release = %release,
                            error = %e,
                            "Failed to look up release"
                        );
                        report.record_lookup_failure();
                        continue;
                    }
                };

                let outcome = self.reconciler.reconcile(resource, &state).await;
                report.record(&outcome);
            }
        }

        Ok(report)
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Why the loop stopped, once it has.
    #[must_use]
    pub const fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// Counters over all completed cycles.
    #[must_use]
    pub const fn totals(&self) -> &CycleTotals {
        &self.totals
    }

    /// Get a stopper handle.
    #[must_use]
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }

    fn finish(&mut self, reason: StopReason) -> LoopOutcome {
        self.state = LoopState::Stopped;
        match reason.error() {
            None => info!(cycles = self.totals.cycles, "Status loop stopping"),
            Some(e) => error!(
                cycles = self.totals.cycles,
                error = %e,
                "Status loop stopping"
            ),
        }
        self.stop_reason = Some(reason.clone());
        LoopOutcome {
            reason,
            totals: self.totals.clone(),
        }
    }
}

/// Handle to stop a status loop.
///
/// Stopping is single-shot: once sent, the signal stays set.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Whether stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// Builder for [`LoopController`].
#[derive(Default)]
pub struct LoopControllerBuilder {
    scopes: Option<Arc<dyn ScopeEnumerator>>,
    resources: Option<Arc<dyn ResourceLister>>,
    patcher: Option<Arc<dyn StatusPatcher>>,
    releases: Option<Arc<dyn ReleaseStateFetcher>>,
    namer: Option<Arc<dyn ReleaseNamer>>,
    config: LoopConfig,
}

impl LoopControllerBuilder {
    /// Use one store for scopes, resources and patches.
    #[must_use]
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: ScopeEnumerator + ResourceLister + StatusPatcher + 'static,
    {
        let scopes: Arc<dyn ScopeEnumerator> = store.clone();
        let resources: Arc<dyn ResourceLister> = store.clone();
        let patcher: Arc<dyn StatusPatcher> = store;
        self.scopes = Some(scopes);
        self.resources = Some(resources);
        self.patcher = Some(patcher);
        self
    }

    /// Set the scope enumerator.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Arc<dyn ScopeEnumerator>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Set the resource lister.
    #[must_use]
    pub fn with_resources(mut self, resources: Arc<dyn ResourceLister>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Set the status patcher.
    #[must_use]
    pub fn with_patcher(mut self, patcher: Arc<dyn StatusPatcher>) -> Self {
        self.patcher = Some(patcher);
        self
    }

    /// Set the release state fetcher.
    #[must_use]
    pub fn with_releases(mut self, releases: Arc<dyn ReleaseStateFetcher>) -> Self {
        self.releases = Some(releases);
        self
    }

    /// Set a custom release namer.
    #[must_use]
    pub fn with_namer(mut self, namer: Arc<dyn ReleaseNamer>) -> Self {
        self.namer = Some(namer);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the controller.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a collaborator is missing.
    pub fn build(self) -> Result<LoopController> {
        let scopes = self
            .scopes
            .ok_or_else(|| Error::invalid_config("scope enumerator is required"))?;
        let resources = self
            .resources
            .ok_or_else(|| Error::invalid_config("resource lister is required"))?;
        let patcher = self
            .patcher
            .ok_or_else(|| Error::invalid_config("status patcher is required"))?;
        let releases = self
            .releases
            .ok_or_else(|| Error::invalid_config("release state fetcher is required"))?;
        let namer: Arc<dyn ReleaseNamer> = match self.namer {
            Some(namer) => namer,
            None => Arc::new(DefaultReleaseNamer),
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(LoopController {
            limiter: RateLimiter::new(self.config.limiter),
            scopes,
            resources,
            releases,
            namer,
            reconciler: StatusReconciler::new(patcher, self.config.call_timeout),
            call_timeout: self.config.call_timeout,
            state: LoopState::Running,
            stop_reason: None,
            totals: CycleTotals::default(),
            stop_rx,
            stop_tx,
        })
    }
}
