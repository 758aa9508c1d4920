//! # helm-annotator
//!
//! Keeps `status.releaseStatus` on every `FluxHelmRelease` in step with the
//! live status of its Helm release.
//!
//! ## Startup
//!
//! 1. **Configuration** - load TOML (optional) and apply flag overrides
//! 2. **Collaborators** - Kubernetes client and helm CLI, or in-memory with `--demo`
//! 3. **Status loop** - run until Ctrl+C or a fatal enumeration failure
//!
//! ## Exit status
//!
//! Zero after a requested shutdown, non-zero when the loop stopped on its own
//! because of a fatal failure.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

mod cli;
mod demo;

use std::sync::Arc;
use std::time::Duration;

use annotator_core::{AnnotatorConfig, Error};
use annotator_helm::HelmCliFetcher;
use annotator_kube::KubeResourceStore;
use annotator_reconciler::{LoopConfig, LoopController, LoopControllerBuilder, StopReason};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let loop_config = LoopConfig::try_from(&config).context("Invalid loop configuration")?;

    let builder = LoopController::builder().with_config(loop_config);
    let builder = if cli.demo {
        demo_collaborators(builder).await
    } else {
        cluster_collaborators(builder, &config).await?
    };
    let mut controller = builder.build().context("Failed to build status loop")?;

    let stopper = controller.stopper();
    let signal_stopper = stopper.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal_stopper.stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let outcome = controller.run().await;
    info!(
        cycles = outcome.totals.cycles,
        patched = outcome.totals.patched,
        lookup_failures = outcome.totals.lookup_failures,
        patch_failures = outcome.totals.patch_failures,
        "helm-annotator exiting"
    );

    exit_status(outcome.reason, stopper.is_stopped())
}

/// Map the loop's stop reason to the process result.
///
/// A stop during the limiter wait surfaces as `WaitAborted`; that one is ours
/// when shutdown was requested. Any other failure fails the process.
fn exit_status(reason: StopReason, shutdown_requested: bool) -> Result<()> {
    match reason {
        StopReason::Requested => Ok(()),
        StopReason::Failed(Error::WaitAborted { .. }) if shutdown_requested => Ok(()),
        StopReason::Failed(e) => Err(e).context("Status loop stopped on a fatal error"),
    }
}

/// Initialize tracing subscriber
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load the config file, if any, and apply flag overrides.
fn load_config(cli: &Cli) -> Result<AnnotatorConfig> {
    let mut config = match &cli.config {
        Some(path) => AnnotatorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AnnotatorConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config
        .validate()
        .context("Invalid configuration after applying flags")?;
    Ok(config)
}

/// Wire the Kubernetes store and the helm CLI.
async fn cluster_collaborators(
    builder: LoopControllerBuilder,
    config: &AnnotatorConfig,
) -> Result<LoopControllerBuilder> {
    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let store = Arc::new(KubeResourceStore::new(client, config.kube.status_subresource));
    let releases = Arc::new(HelmCliFetcher::from_settings(&config.helm));

    info!(
        helm = %config.helm.binary,
        status_subresource = config.kube.status_subresource,
        "Using cluster collaborators"
    );
    Ok(builder.with_store(store).with_releases(releases))
}

/// Wire seeded in-memory collaborators.
async fn demo_collaborators(builder: LoopControllerBuilder) -> LoopControllerBuilder {
    let (store, releases) = demo::seed().await;
    demo::spawn_drift(releases.clone(), Duration::from_secs(15));

    info!("Using in-memory demo collaborators");
    builder.with_store(store).with_releases(releases)
}
