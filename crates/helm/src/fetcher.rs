//! Release lookups through `helm status`.

use std::process::Stdio;

use annotator_core::{Error, HelmSettings, ReleaseName, ReleaseState, ReleaseStatusCode, Result};
use annotator_reconciler::ReleaseStateFetcher;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

/// The part of `helm status --output json` the annotator reads.
#[derive(Debug, Deserialize)]
struct StatusOutput {
    info: StatusInfo,
    #[serde(default)]
    version: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StatusInfo {
    status: String,
}

/// Parse the JSON printed by `helm status <release> --output json`.
///
/// # Errors
///
/// Returns `LookupFailed` for malformed output or an unknown status code.
pub fn parse_status_output(release: &ReleaseName, stdout: &str) -> Result<ReleaseState> {
    let output: StatusOutput = serde_json::from_str(stdout)
        .map_err(|e| Error::lookup_failed(release.as_str(), format!("invalid helm output: {e}")))?;

    let code: ReleaseStatusCode = output
        .info
        .status
        .parse()
        .map_err(|e: Error| Error::lookup_failed(release.as_str(), e.to_string()))?;

    Ok(ReleaseState {
        name: release.clone(),
        code,
        revision: output.version,
    })
}

/// Fetches release state by running the `helm` CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmCliFetcher {
    binary: String,
    namespace: Option<String>,
    kube_context: Option<String>,
}

impl HelmCliFetcher {
    /// Create a fetcher running `binary`.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            namespace: None,
            kube_context: None,
        }
    }

    /// Look every release up in `namespace` instead of its resource's scope.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Use `context` from the kubeconfig.
    #[must_use]
    pub fn with_kube_context(mut self, context: impl Into<String>) -> Self {
        self.kube_context = Some(context.into());
        self
    }

    /// Build a fetcher from the `[helm]` config section. Empty strings mean unset.
    #[must_use]
    pub fn from_settings(settings: &HelmSettings) -> Self {
        let fetcher = Self::new(settings.binary.clone());
        let fetcher = if settings.namespace.is_empty() {
            fetcher
        } else {
            fetcher.with_namespace(settings.namespace.clone())
        };
        if settings.kube_context.is_empty() {
            fetcher
        } else {
            fetcher.with_kube_context(settings.kube_context.clone())
        }
    }

    /// Arguments passed to the CLI for `release` of a resource in `scope`.
    ///
    /// Helm 3 releases are namespaced, so the lookup goes to the configured
    /// namespace if there is one and to `scope` otherwise.
    #[must_use]
    pub fn args(&self, scope: &str, release: &ReleaseName) -> Vec<String> {
        let mut args = vec![
            "status".to_string(),
            release.as_str().to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        let namespace = self
            .namespace
            .as_deref()
            .or_else(|| (!scope.is_empty()).then_some(scope));
        if let Some(namespace) = namespace {
            args.push("--namespace".to_string());
            args.push(namespace.to_string());
        }
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".to_string());
            args.push(context.clone());
        }
        args
    }

    fn failure(&self, release: &ReleaseName, detail: String) -> Error {
        Error::lookup_failed(release.as_str(), format!("{} {detail}", self.binary))
    }
}

#[async_trait]
impl ReleaseStateFetcher for HelmCliFetcher {
    async fn fetch_state(&self, scope: &str, release: &ReleaseName) -> Result<ReleaseState> {
        let args = self.args(scope, release);
        debug!(cli = %self.binary, args = ?args, "Running helm CLI");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.failure(release, format!("failed to spawn: {e}")))?
            .wait_with_output()
            .await
            .map_err(|e| self.failure(release, format!("failed to wait: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(
                release,
                format!("exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        parse_status_output(release, &String::from_utf8_lossy(&output.stdout))
    }
}
