//! In-memory collaborators.
//!
//! Both types record every call they receive and can be told to fail for a
//! given scope, release or resource. They back the tests and the demo mode
//! of the binary.

use std::collections::HashMap;
use std::time::Duration;

use annotator_core::{
    Error, ManagedResource, ReleaseName, ReleaseState, ReleaseStatusCode, ResourceKey, Result,
    StatusPatch,
};
use async_trait::async_trait;
use itertools::Itertools;
use tokio::sync::RwLock;

use crate::provider::{ReleaseStateFetcher, ResourceLister, ScopeEnumerator, StatusPatcher};

/// A patch as the store received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPatch {
    /// Resource the patch was addressed to.
    pub key: ResourceKey,
    /// Serialized patch body.
    pub body: serde_json::Value,
}

#[derive(Debug, Default)]
struct StoreState {
    scopes: Vec<String>,
    resources: HashMap<String, Vec<ManagedResource>>,
    scope_listing_failure: Option<String>,
    resource_listing_failures: HashMap<String, String>,
    patch_failures: HashMap<ResourceKey, String>,
    scope_listings: usize,
    resource_listings: Vec<String>,
    patches: Vec<RecordedPatch>,
}

/// Resource store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    state: RwLock<StoreState>,
    latency: Duration,
}

impl InMemoryResourceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register an empty scope.
    pub async fn add_scope(&self, scope: impl Into<String>) {
        let scope = scope.into();
        let mut state = self.state.write().await;
        if !state.scopes.contains(&scope) {
            state.resources.insert(scope.clone(), Vec::new());
            state.scopes.push(scope);
        }
    }

    /// Insert a resource, registering its scope if needed.
    pub async fn insert(&self, resource: ManagedResource) {
        self.add_scope(resource.scope()).await;
        let mut state = self.state.write().await;
        let entries = state.resources.entry(resource.scope().to_string()).or_default();
        entries.retain(|r| r.key != resource.key);
        entries.push(resource);
    }

    /// Make scope listing fail with `reason`.
    pub async fn fail_scope_listing(&self, reason: impl Into<String>) {
        self.state.write().await.scope_listing_failure = Some(reason.into());
    }

    /// Make resource listing in `scope` fail with `reason`.
    pub async fn fail_resource_listing(&self, scope: impl Into<String>, reason: impl Into<String>) {
        self.state
            .write()
            .await
            .resource_listing_failures
            .insert(scope.into(), reason.into());
    }

    /// Make patches to `key` fail with `reason`.
    pub async fn fail_patch(&self, key: ResourceKey, reason: impl Into<String>) {
        self.state
            .write()
            .await
            .patch_failures
            .insert(key, reason.into());
    }

    /// Current copy of a resource.
    pub async fn resource(&self, key: &ResourceKey) -> Option<ManagedResource> {
        self.state
            .read()
            .await
            .resources
            .get(&key.scope)
            .and_then(|entries| entries.iter().find(|r| &r.key == key).cloned())
    }

    /// Every patch applied so far, in order.
    pub async fn patches(&self) -> Vec<RecordedPatch> {
        self.state.read().await.patches.clone()
    }

    /// Patches applied to one resource.
    pub async fn patches_for(&self, key: &ResourceKey) -> Vec<RecordedPatch> {
        self.state
            .read()
            .await
            .patches
            .iter()
            .filter(|p| &p.key == key)
            .cloned()
            .collect_vec()
    }

    /// Number of scope listings served.
    pub async fn scope_listings(&self) -> usize {
        self.state.read().await.scope_listings
    }

    /// Scopes whose resources were listed, in call order.
    pub async fn resource_listings(&self) -> Vec<String> {
        self.state.read().await.resource_listings.clone()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ScopeEnumerator for InMemoryResourceStore {
    async fn list_scopes(&self) -> Result<Vec<String>> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.scope_listings = state.scope_listings.saturating_add(1);
        match &state.scope_listing_failure {
            Some(reason) => Err(Error::scope_list_failed(reason.clone())),
            None => Ok(state.scopes.clone()),
        }
    }
}

#[async_trait]
impl ResourceLister for InMemoryResourceStore {
    async fn list_resources(&self, scope: &str) -> Result<Vec<ManagedResource>> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        state.resource_listings.push(scope.to_string());
        if let Some(reason) = state.resource_listing_failures.get(scope) {
            return Err(Error::resource_list_failed(scope, reason.clone()));
        }
        Ok(state.resources.get(scope).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl StatusPatcher for InMemoryResourceStore {
    async fn patch_status(&self, key: &ResourceKey, patch: &StatusPatch) -> Result<()> {
        self.simulate_latency().await;
        let body = patch.to_value()?;
        let mut state = self.state.write().await;

        if let Some(reason) = state.patch_failures.get(key) {
            return Err(Error::patch_failed(&key.scope, &key.name, reason.clone()));
        }

        let target = state
            .resources
            .get_mut(&key.scope)
            .and_then(|entries| entries.iter_mut().find(|r| &r.key == key))
            .ok_or_else(|| Error::patch_failed(&key.scope, &key.name, "resource not found"))?;
        target.release_status = patch.release_status().to_string();

        state.patches.push(RecordedPatch {
            key: key.clone(),
            body,
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ReleaseManagerState {
    releases: HashMap<ReleaseName, ReleaseState>,
    failures: HashMap<ReleaseName, String>,
    lookups: Vec<ReleaseName>,
    lookup_scopes: Vec<String>,
}

/// Release manager held in memory.
#[derive(Debug, Default)]
pub struct InMemoryReleaseManager {
    state: RwLock<ReleaseManagerState>,
    latency: Duration,
}

impl InMemoryReleaseManager {
    /// Create a release manager with no releases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the live status of a release.
    pub async fn set_status(&self, name: impl Into<String>, code: ReleaseStatusCode) {
        let name = ReleaseName::new(name);
        self.state
            .write()
            .await
            .releases
            .insert(name.clone(), ReleaseState::new(name, code));
    }

    /// Make lookups of `name` fail with `reason`.
    pub async fn fail_lookup(&self, name: impl Into<String>, reason: impl Into<String>) {
        self.state
            .write()
            .await
            .failures
            .insert(ReleaseName::new(name), reason.into());
    }

    /// Every lookup received, in order.
    pub async fn lookups(&self) -> Vec<ReleaseName> {
        self.state.read().await.lookups.clone()
    }

    /// Scope passed with each lookup, in order.
    ///
    /// Names are global here, so the scope only gets recorded.
    pub async fn lookup_scopes(&self) -> Vec<String> {
        self.state.read().await.lookup_scopes.clone()
    }
}

#[async_trait]
impl ReleaseStateFetcher for InMemoryReleaseManager {
    async fn fetch_state(&self, scope: &str, release: &ReleaseName) -> Result<ReleaseState> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut state = self.state.write().await;
        state.lookups.push(release.clone());
        state.lookup_scopes.push(scope.to_string());

        if let Some(reason) = state.failures.get(release) {
            return Err(Error::lookup_failed(release.as_str(), reason.clone()));
        }
        state
            .releases
            .get(release)
            .cloned()
            .ok_or_else(|| Error::lookup_failed(release.as_str(), "release: not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_lists_scopes_in_insertion_order() -> Result<()> {
        let store = InMemoryResourceStore::new();
        store.insert(ManagedResource::new("ns-b", "r1")).await;
        store.insert(ManagedResource::new("ns-a", "r2")).await;
        store.add_scope("ns-b").await;

        assert_eq!(store.list_scopes().await?, vec!["ns-b", "ns-a"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_updates_only_status() -> Result<()> {
        let store = InMemoryResourceStore::new();
        let resource = ManagedResource::new("ns-a", "r1")
            .with_release_name("custom")
            .with_status("PENDING");
        store.insert(resource.clone()).await;

        store
            .patch_status(&resource.key, &StatusPatch::new("DEPLOYED"))
            .await?;

        let patched = store.resource(&resource.key).await;
        assert_eq!(
            patched,
            Some(resource.clone().with_status("DEPLOYED"))
        );
        assert_eq!(
            store.patches().await.first().map(|p| p.body.clone()),
            Some(serde_json::json!({ "status": { "releaseStatus": "DEPLOYED" } }))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_patch_to_missing_resource_fails() {
        let store = InMemoryResourceStore::new();
        let result = store
            .patch_status(&ResourceKey::new("ns-a", "ghost"), &StatusPatch::new("DEPLOYED"))
            .await;
        assert!(matches!(result, Err(Error::PatchFailed { .. })));
        assert!(store.patches().await.is_empty());
    }

    #[tokio::test]
    async fn test_release_manager_reports_missing_release() {
        let manager = InMemoryReleaseManager::new();
        let result = manager.fetch_state("ns-a", &ReleaseName::new("absent")).await;
        assert!(matches!(result, Err(Error::LookupFailed { .. })));
        assert_eq!(manager.lookups().await, vec![ReleaseName::new("absent")]);
        assert_eq!(manager.lookup_scopes().await, vec!["ns-a"]);
    }
}
