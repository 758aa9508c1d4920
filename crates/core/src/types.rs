//! Data model shared by the store, the release manager and the loop.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Scope used when a resource carries no namespace.
pub const DEFAULT_SCOPE: &str = "default";

/// Addressing identity of a managed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// Scope (namespace) the resource lives in.
    pub scope: String,
    /// Resource name within the scope.
    pub name: String,
}

impl ResourceKey {
    /// Create a new resource key.
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

/// A custom resource that mirrors the status of one release.
///
/// Owned by the resource store. The loop only reads it and, on drift,
/// patches `release_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResource {
    /// Scope and name.
    pub key: ResourceKey,
    /// Explicit release name from the resource spec, if any.
    #[serde(default)]
    pub release_name: Option<String>,
    /// Last recorded release status. Empty when never recorded.
    #[serde(default)]
    pub release_status: String,
}

impl ManagedResource {
    /// Create a resource with no recorded status.
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: ResourceKey::new(scope, name),
            release_name: None,
            release_status: String::new(),
        }
    }

    /// Set the recorded status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.release_status = status.into();
        self
    }

    /// Set an explicit release name.
    #[must_use]
    pub fn with_release_name(mut self, name: impl Into<String>) -> Self {
        self.release_name = Some(name.into());
        self
    }

    /// Scope the resource lives in.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.key.scope
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.key.name
    }
}

/// Name of the release a resource corresponds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseName(String);

impl ReleaseName {
    /// Create a release name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a release as reported by the release manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReleaseStatusCode {
    #[default]
    Unknown,
    Deployed,
    Deleted,
    Superseded,
    Failed,
    Deleting,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl ReleaseStatusCode {
    /// Every status code, in wire order.
    pub const ALL: [Self; 9] = [
        Self::Unknown,
        Self::Deployed,
        Self::Deleted,
        Self::Superseded,
        Self::Failed,
        Self::Deleting,
        Self::PendingInstall,
        Self::PendingUpgrade,
        Self::PendingRollback,
    ];

    /// Canonical rendering, the value recorded on the resource.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Deployed => "DEPLOYED",
            Self::Deleted => "DELETED",
            Self::Superseded => "SUPERSEDED",
            Self::Failed => "FAILED",
            Self::Deleting => "DELETING",
            Self::PendingInstall => "PENDING_INSTALL",
            Self::PendingUpgrade => "PENDING_UPGRADE",
            Self::PendingRollback => "PENDING_ROLLBACK",
        }
    }
}

impl fmt::Display for ReleaseStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatusCode {
    type Err = Error;

    /// Accepts the canonical form (`PENDING_UPGRADE`) as well as the
    /// lowercase, hyphenated form printed by Helm 3 (`pending-upgrade`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "UNINSTALLED" => Ok(Self::Deleted),
            "UNINSTALLING" => Ok(Self::Deleting),
            other => Self::ALL
                .into_iter()
                .find(|code| code.as_str() == other)
                .ok_or_else(|| Error::unknown_release_status(s)),
        }
    }
}

/// Live state of a release, fetched fresh every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseState {
    /// Release the state belongs to.
    pub name: ReleaseName,
    /// Current status code.
    pub code: ReleaseStatusCode,
    /// Release revision, when the release manager reports one.
    pub revision: Option<u64>,
}

impl ReleaseState {
    /// Create a release state without revision information.
    #[must_use]
    pub const fn new(name: ReleaseName, code: ReleaseStatusCode) -> Self {
        Self {
            name,
            code,
            revision: None,
        }
    }

    /// Status string as it would be recorded on the resource.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        self.code.as_str()
    }
}

/// Merge patch carrying only the new release status.
///
/// Serializes to `{"status":{"releaseStatus":"<CODE>"}}`; no other field can
/// be expressed, so a patch never touches anything but the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPatch {
    status: StatusFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusFields {
    release_status: String,
}

impl StatusPatch {
    /// Create a patch setting the release status.
    pub fn new(release_status: impl Into<String>) -> Self {
        Self {
            status: StatusFields {
                release_status: release_status.into(),
            },
        }
    }

    /// Status value the patch sets.
    #[must_use]
    pub fn release_status(&self) -> &str {
        &self.status.release_status
    }

    /// Serialize the patch to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns `SerializationFailed` if serde cannot encode the patch.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| Error::serialization_failed(e.to_string()))
    }

    /// Serialize the patch to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns `SerializationFailed` if serde cannot encode the patch.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::serialization_failed(e.to_string()))
    }
}
