//! Status reconciler: mirrors a release's live status onto its resource.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use annotator_core::{Error, ManagedResource, ReleaseState, Result, ResultExt, StatusPatch};
use tracing::{debug, info, warn};

use crate::provider::StatusPatcher;
use crate::types::ReconcileOutcome;

/// Await `call`, failing with `on_timeout` once `limit` has passed.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    call: F,
    on_timeout: impl FnOnce(String) -> Error,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
        Err(on_timeout(format!(
            "timed out after {}ms",
            limit.as_millis()
        )))
    })
}

/// Compares recorded and live status and patches on drift.
///
/// The patch is an unconditional merge of the status field: the store offers
/// no compare-and-swap for custom resources, so the last writer wins.
pub struct StatusReconciler {
    patcher: Arc<dyn StatusPatcher>,
    call_timeout: Duration,
}

impl StatusReconciler {
    /// Create a reconciler patching through `patcher`.
    pub fn new(patcher: Arc<dyn StatusPatcher>, call_timeout: Duration) -> Self {
        Self {
            patcher,
            call_timeout,
        }
    }

    /// The patch needed to bring `resource` in line with `state`, if any.
    #[must_use]
    pub fn diff(resource: &ManagedResource, state: &ReleaseState) -> Option<StatusPatch> {
        let live = state.status();
        (live != resource.release_status).then(|| StatusPatch::new(live))
    }

    /// Reconcile one resource against the live state of its release.
    ///
    /// Failures are logged here with the resource's address; the caller only
    /// needs to count them and move on.
    ///
    /// # Errors
    ///
    /// Returns `SerializationFailed` or `PatchFailed` (both recoverable).
    pub async fn reconcile(
        &self,
        resource: &ManagedResource,
        state: &ReleaseState,
    ) -> Result<ReconcileOutcome> {
        let Some(patch) = Self::diff(resource, state) else {
            debug!(
                scope = resource.scope(),
                resource = resource.name(),
                status = state.status(),
                "Release status in sync"
            );
            return Ok(ReconcileOutcome::InSync);
        };

        let key = &resource.key;
        bounded(
            self.call_timeout,
            self.patcher.patch_status(key, &patch),
            |reason| Error::patch_failed(&key.scope, &key.name, reason),
        )
        .await
        .inspect_error(|e| {
            warn!(
                scope = resource.scope(),
                resource = resource.name(),
                release = %state.name,
                error = %e,
                "Failed to patch release status"
            );
        })?;

        info!(
            scope = resource.scope(),
            resource = resource.name(),
            release = %state.name,
            revision = ?state.revision,
            from = %resource.release_status,
            to = patch.release_status(),
            "Patched release status"
        );

        Ok(ReconcileOutcome::Patched {
            from: resource.release_status.clone(),
            to: patch.release_status().to_string(),
            revision: state.revision,
        })
    }
}
