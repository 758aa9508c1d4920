//! Collaborators the loop talks to.
//!
//! The resource store (scopes, resources, patches) and the release manager
//! are external systems; these traits are the only surface the loop needs
//! from them.

use annotator_core::{
    DEFAULT_SCOPE, ManagedResource, ReleaseName, ReleaseState, ResourceKey, Result, StatusPatch,
};
use async_trait::async_trait;

/// Lists the scopes (namespaces) to search for managed resources.
#[async_trait]
pub trait ScopeEnumerator: Send + Sync {
    /// List every scope currently visible.
    ///
    /// # Errors
    ///
    /// Returns `ScopeListFailed` when the store cannot be reached.
    async fn list_scopes(&self) -> Result<Vec<String>>;
}

/// Lists managed resources within a scope.
#[async_trait]
pub trait ResourceLister: Send + Sync {
    /// List every managed resource in `scope`, in store order.
    ///
    /// # Errors
    ///
    /// Returns `ResourceListFailed` when the store cannot be reached.
    async fn list_resources(&self, scope: &str) -> Result<Vec<ManagedResource>>;
}

/// Applies merge patches to a resource's status.
#[async_trait]
pub trait StatusPatcher: Send + Sync {
    /// Apply `patch` to the resource addressed by `key`.
    ///
    /// # Errors
    ///
    /// Returns `SerializationFailed` or `PatchFailed`.
    async fn patch_status(&self, key: &ResourceKey, patch: &StatusPatch) -> Result<()>;
}

/// Reads the live state of a release from the release manager.
#[async_trait]
pub trait ReleaseStateFetcher: Send + Sync {
    /// Fetch the current state of `release`.
    ///
    /// `scope` is the namespace of the resource the release belongs to.
    /// Release managers with namespaced releases look there; others ignore it.
    ///
    /// # Errors
    ///
    /// Returns `LookupFailed` when the release manager has no content for the
    /// name or cannot be reached.
    async fn fetch_state(&self, scope: &str, release: &ReleaseName) -> Result<ReleaseState>;
}

/// Derives the release name a resource corresponds to.
pub trait ReleaseNamer: Send + Sync {
    /// Pure function of the resource's identity and spec.
    fn release_name(&self, resource: &ManagedResource) -> ReleaseName;
}

/// Naming used by Flux: the explicit `releaseName` when set, otherwise
/// `<namespace>-<name>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReleaseNamer;

impl ReleaseNamer for DefaultReleaseNamer {
    fn release_name(&self, resource: &ManagedResource) -> ReleaseName {
        match resource.release_name.as_deref() {
            Some(explicit) if !explicit.is_empty() => ReleaseName::new(explicit),
            _ => {
                let scope = if resource.scope().is_empty() {
                    DEFAULT_SCOPE
                } else {
                    resource.scope()
                };
                ReleaseName::new(format!("{scope}-{}", resource.name()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_joins_scope_and_name() {
        let resource = ManagedResource::new("ns-a", "r1");
        assert_eq!(DefaultReleaseNamer.release_name(&resource).as_str(), "ns-a-r1");
    }

    #[test]
    fn test_explicit_release_name_wins() {
        let resource = ManagedResource::new("ns-a", "r1").with_release_name("mysql");
        assert_eq!(DefaultReleaseNamer.release_name(&resource).as_str(), "mysql");
    }

    #[test]
    fn test_empty_release_name_falls_back() {
        let resource = ManagedResource::new("ns-a", "r1").with_release_name("");
        assert_eq!(DefaultReleaseNamer.release_name(&resource).as_str(), "ns-a-r1");
    }

    #[test]
    fn test_empty_scope_uses_default() {
        let resource = ManagedResource::new("", "r1");
        assert_eq!(
            DefaultReleaseNamer.release_name(&resource).as_str(),
            "default-r1"
        );
    }
}
