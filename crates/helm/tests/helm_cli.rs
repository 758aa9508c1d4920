//! Process-level behaviour of the helm fetcher.

#![forbid(clippy::unwrap_used)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

use annotator_core::{Error, ReleaseName};
use annotator_helm::HelmCliFetcher;
use annotator_reconciler::ReleaseStateFetcher;

/// # GIVEN
/// A fetcher pointing at a binary that does not exist
///
/// # WHEN
/// A release is looked up
///
/// # THEN
/// The lookup fails recoverably and names the release
#[tokio::test]
async fn missing_binary_is_lookup_failure() {
    let fetcher = HelmCliFetcher::new("/nonexistent/helm-annotator-test/helm");

    let result = fetcher.fetch_state("apps", &ReleaseName::new("apps-podinfo")).await;

    assert!(matches!(
        result,
        Err(Error::LookupFailed { ref release, .. }) if release == "apps-podinfo"
    ));
    assert!(result.err().is_some_and(|e| !e.is_fatal()));
}

/// # GIVEN
/// A binary that always exits non-zero
///
/// # WHEN
/// A release is looked up
///
/// # THEN
/// The exit status is reported as a lookup failure
#[cfg(unix)]
#[tokio::test]
async fn non_zero_exit_is_lookup_failure() {
    let fetcher = HelmCliFetcher::new("false");

    let result = fetcher.fetch_state("apps", &ReleaseName::new("apps-podinfo")).await;

    assert!(matches!(
        result,
        Err(Error::LookupFailed { ref reason, .. }) if reason.contains("exited with")
    ));
}
