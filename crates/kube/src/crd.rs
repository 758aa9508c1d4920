//! `FluxHelmRelease` custom resource.

use annotator_core::ManagedResource;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// Desired state of a Helm release managed by Flux.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "helm.integrations.flux.weave.works",
    version = "v1alpha2",
    kind = "FluxHelmRelease",
    namespaced,
    status = "FluxHelmReleaseStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct FluxHelmReleaseSpec {
    /// Path of the chart inside the Flux git repository.
    #[serde(default)]
    pub chart_git_path: String,

    /// Explicit release name; derived from namespace and name when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,

    /// Values passed to the chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<serde_json::Value>,
}

/// Observed state written back by the annotator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FluxHelmReleaseStatus {
    /// Helm status code last seen for the release.
    #[serde(default)]
    pub release_status: String,
}

impl FluxHelmRelease {
    /// View this resource as the loop sees it.
    ///
    /// `scope` is the namespace it was listed from, used when the object
    /// carries none.
    #[must_use]
    pub fn to_managed(&self, scope: &str) -> ManagedResource {
        let namespace = self.namespace().unwrap_or_else(|| scope.to_string());
        let mut resource = ManagedResource::new(namespace, self.name_any());
        resource.release_name = self.spec.release_name.clone();
        resource.release_status = self
            .status
            .as_ref()
            .map(|status| status.release_status.clone())
            .unwrap_or_default();
        resource
    }
}

#[cfg(test)]
mod tests {
    use kube::Resource;

    use super::*;

    fn release(namespace: Option<&str>, spec: FluxHelmReleaseSpec) -> FluxHelmRelease {
        let mut fhr = FluxHelmRelease::new("podinfo", spec);
        fhr.meta_mut().namespace = namespace.map(str::to_string);
        fhr
    }

    #[test]
    fn test_api_coordinates() {
        assert_eq!(FluxHelmRelease::group(&()), "helm.integrations.flux.weave.works");
        assert_eq!(FluxHelmRelease::version(&()), "v1alpha2");
        assert_eq!(FluxHelmRelease::kind(&()), "FluxHelmRelease");
    }

    #[test]
    fn test_to_managed_without_status() {
        let fhr = release(Some("apps"), FluxHelmReleaseSpec::default());
        let managed = fhr.to_managed("apps");

        assert_eq!(managed.scope(), "apps");
        assert_eq!(managed.name(), "podinfo");
        assert_eq!(managed.release_name, None);
        assert_eq!(managed.release_status, "");
    }

    #[test]
    fn test_to_managed_carries_release_name_and_status() {
        let spec = FluxHelmReleaseSpec {
            release_name: Some("podinfo-prod".to_string()),
            ..FluxHelmReleaseSpec::default()
        };
        let mut fhr = release(Some("apps"), spec);
        fhr.status = Some(FluxHelmReleaseStatus {
            release_status: "DEPLOYED".to_string(),
        });

        let managed = fhr.to_managed("apps");

        assert_eq!(managed.release_name.as_deref(), Some("podinfo-prod"));
        assert_eq!(managed.release_status, "DEPLOYED");
    }

    #[test]
    fn test_to_managed_falls_back_to_listing_scope() {
        let fhr = release(None, FluxHelmReleaseSpec::default());
        assert_eq!(fhr.to_managed("team-a").scope(), "team-a");
    }

    #[test]
    fn test_deserializes_manifest() -> Result<(), serde_json::Error> {
        let fhr: FluxHelmRelease = serde_json::from_value(serde_json::json!({
            "apiVersion": "helm.integrations.flux.weave.works/v1alpha2",
            "kind": "FluxHelmRelease",
            "metadata": { "name": "podinfo", "namespace": "apps" },
            "spec": {
                "chartGitPath": "podinfo",
                "releaseName": "podinfo-prod",
                "values": { "replicaCount": 2 }
            },
            "status": { "releaseStatus": "FAILED" }
        }))?;

        assert_eq!(fhr.spec.chart_git_path, "podinfo");
        assert_eq!(fhr.to_managed("apps").release_status, "FAILED");
        Ok(())
    }
}
