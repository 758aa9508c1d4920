//! Resource store backed by the Kubernetes API.

use annotator_core::{Error, ManagedResource, ResourceKey, Result, StatusPatch};
use annotator_reconciler::{ResourceLister, ScopeEnumerator, StatusPatcher};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::crd::FluxHelmRelease;

/// Lists namespaces and `FluxHelmRelease` objects, and patches their status.
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
    status_subresource: bool,
}

impl KubeResourceStore {
    /// Create a store over `client`.
    ///
    /// `v1alpha2` of the resource has no status subresource, so patches go
    /// to the main resource unless `status_subresource` is set.
    #[must_use]
    pub const fn new(client: Client, status_subresource: bool) -> Self {
        Self {
            client,
            status_subresource,
        }
    }

    fn releases(&self, scope: &str) -> Api<FluxHelmRelease> {
        Api::namespaced(self.client.clone(), scope)
    }
}

#[async_trait]
impl ScopeEnumerator for KubeResourceStore {
    async fn list_scopes(&self) -> Result<Vec<String>> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::scope_list_failed(e.to_string()))?;

        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }
}

#[async_trait]
impl ResourceLister for KubeResourceStore {
    async fn list_resources(&self, scope: &str) -> Result<Vec<ManagedResource>> {
        let list = self
            .releases(scope)
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::resource_list_failed(scope, e.to_string()))?;

        debug!(scope, count = list.items.len(), "Listed FluxHelmReleases");
        Ok(list.items.iter().map(|fhr| fhr.to_managed(scope)).collect())
    }
}

#[async_trait]
impl StatusPatcher for KubeResourceStore {
    async fn patch_status(&self, key: &ResourceKey, patch: &StatusPatch) -> Result<()> {
        let body = Patch::Merge(patch.to_value()?);
        let params = PatchParams::default();
        let api = self.releases(&key.scope);

        let patched = if self.status_subresource {
            api.patch_status(&key.name, &params, &body).await
        } else {
            api.patch(&key.name, &params, &body).await
        };

        patched
            .map(|_| ())
            .map_err(|e| Error::patch_failed(&key.scope, &key.name, e.to_string()))
    }
}
