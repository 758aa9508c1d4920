//! CLI definition using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;
use std::time::Duration;

use annotator_core::AnnotatorConfig;
use clap::Parser;

/// Helm release annotator
#[derive(Parser, Debug)]
#[command(name = "helm-annotator")]
#[command(version)]
#[command(about = "Mirror Helm release status onto FluxHelmRelease resources")]
#[command(
    long_about = "Patches FluxHelmRelease status.releaseStatus when its Helm release drifts."
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Minimum seconds between cycle starts once the burst is spent
    #[arg(long, value_name = "N")]
    pub interval_secs: Option<u64>,

    /// Cycles that may start back to back
    #[arg(long, value_name = "N")]
    pub burst: Option<u32>,

    /// Upper bound in seconds for each Kubernetes or Helm call
    #[arg(long, value_name = "N")]
    pub call_timeout_secs: Option<u64>,

    /// Run against seeded in-memory collaborators instead of a cluster
    #[arg(long, default_value_t = false)]
    pub demo: bool,
}

impl Cli {
    /// Apply flag overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AnnotatorConfig) {
        if let Some(secs) = self.interval_secs {
            config.limiter.interval = Duration::from_secs(secs);
        }
        if let Some(burst) = self.burst {
            config.limiter.burst = burst;
        }
        if let Some(secs) = self.call_timeout_secs {
            config.timeouts.call_timeout = Duration::from_secs(secs);
        }
    }
}
