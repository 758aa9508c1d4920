//! Seeded in-memory collaborators for `--demo`.

use std::sync::Arc;
use std::time::Duration;

use annotator_core::{ManagedResource, ReleaseStatusCode};
use annotator_reconciler::{InMemoryReleaseManager, InMemoryResourceStore};
use tracing::info;

/// Release whose status the demo keeps changing.
const DRIFTING_RELEASE: &str = "apps-podinfo";

/// Build a store and release manager with a few resources out of step.
pub async fn seed() -> (Arc<InMemoryResourceStore>, Arc<InMemoryReleaseManager>) {
    let store = Arc::new(InMemoryResourceStore::new());
    let releases = Arc::new(InMemoryReleaseManager::new());

    store
        .insert(ManagedResource::new("apps", "podinfo").with_status("PENDING_INSTALL"))
        .await;
    store
        .insert(ManagedResource::new("apps", "frontend").with_status("DEPLOYED"))
        .await;
    store
        .insert(
            ManagedResource::new("flux", "memcached")
                .with_release_name("cache")
                .with_status("DEPLOYED"),
        )
        .await;
    store
        .insert(ManagedResource::new("flux", "orphan"))
        .await;
    store.add_scope("kube-system").await;

    releases
        .set_status(DRIFTING_RELEASE, ReleaseStatusCode::Deployed)
        .await;
    releases
        .set_status("apps-frontend", ReleaseStatusCode::Deployed)
        .await;
    releases.set_status("cache", ReleaseStatusCode::Failed).await;

    (store, releases)
}

/// Move the drifting release through an upgrade every `period`.
pub fn spawn_drift(releases: Arc<InMemoryReleaseManager>, period: Duration) {
    const STEPS: [ReleaseStatusCode; 3] = [
        ReleaseStatusCode::PendingUpgrade,
        ReleaseStatusCode::Deployed,
        ReleaseStatusCode::Superseded,
    ];

    tokio::spawn(async move {
        for code in STEPS.iter().cycle() {
            tokio::time::sleep(period).await;
            info!(release = DRIFTING_RELEASE, status = %code, "Demo release changed");
            releases.set_status(DRIFTING_RELEASE, *code).await;
        }
    });
}
