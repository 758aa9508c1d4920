//! Core error types for the annotator.
//!
//! Every failure the status loop can meet is one of these variants. The
//! variant decides the failure's class: enumeration failures stop the loop,
//! per-resource lookup and patch failures only skip that resource.

use std::path::PathBuf;

use thiserror::Error;

/// Whether a failure ends the loop or only skips the current resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The loop cannot trust its view of the world and must stop.
    Fatal,
    /// Only the affected resource is skipped; the next cycle retries it.
    Recoverable,
}

/// Core error type for annotator operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // Enumeration errors (loop-fatal)
    #[error("failed to list scopes: {reason}")]
    ScopeListFailed { reason: String },

    #[error("failed to list resources in scope '{scope}': {reason}")]
    ResourceListFailed { scope: String, reason: String },

    #[error("rate limiter wait aborted: {reason}")]
    WaitAborted { reason: String },

    // Per-resource errors (recoverable)
    #[error("failed to look up release '{release}': {reason}")]
    LookupFailed { release: String, reason: String },

    #[error("failed to patch '{scope}/{resource}': {reason}")]
    PatchFailed {
        scope: String,
        resource: String,
        reason: String,
    },

    #[error("failed to serialize status patch: {reason}")]
    SerializationFailed { reason: String },

    #[error("unknown release status '{value}'")]
    UnknownReleaseStatus { value: String },

    // Configuration errors
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to read config '{}': {}", .path.display(), .reason)]
    ConfigReadFailed { path: PathBuf, reason: String },
}

impl Error {
    /// Create a scope listing error.
    pub fn scope_list_failed(reason: impl Into<String>) -> Self {
        Self::ScopeListFailed {
            reason: reason.into(),
        }
    }

    /// Create a resource listing error.
    pub fn resource_list_failed(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceListFailed {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Create a rate limiter abort error.
    pub fn wait_aborted(reason: impl Into<String>) -> Self {
        Self::WaitAborted {
            reason: reason.into(),
        }
    }

    /// Create a release lookup error.
    pub fn lookup_failed(release: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LookupFailed {
            release: release.into(),
            reason: reason.into(),
        }
    }

    /// Create a patch error.
    pub fn patch_failed(
        scope: impl Into<String>,
        resource: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::PatchFailed {
            scope: scope.into(),
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization_failed(reason: impl Into<String>) -> Self {
        Self::SerializationFailed {
            reason: reason.into(),
        }
    }

    /// Create an unknown release status error.
    pub fn unknown_release_status(value: impl Into<String>) -> Self {
        Self::UnknownReleaseStatus {
            value: value.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a config read error.
    pub fn config_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Classify the error.
    ///
    /// Configuration errors are fatal: they can only surface before the loop
    /// starts or while wiring it.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::LookupFailed { .. }
            | Self::PatchFailed { .. }
            | Self::SerializationFailed { .. }
            | Self::UnknownReleaseStatus { .. } => ErrorClass::Recoverable,
            Self::ScopeListFailed { .. }
            | Self::ResourceListFailed { .. }
            | Self::WaitAborted { .. }
            | Self::InvalidConfig { .. }
            | Self::ConfigReadFailed { .. } => ErrorClass::Fatal,
        }
    }

    /// Check whether the error ends the loop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self.class(), ErrorClass::Fatal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumeration_errors_are_fatal() {
        assert!(Error::scope_list_failed("connection refused").is_fatal());
        assert!(Error::resource_list_failed("ns-a", "connection refused").is_fatal());
        assert!(Error::wait_aborted("stop requested").is_fatal());
    }

    #[test]
    fn test_per_resource_errors_are_recoverable() {
        assert_eq!(
            Error::lookup_failed("ns-a-r1", "not found").class(),
            ErrorClass::Recoverable
        );
        assert_eq!(
            Error::patch_failed("ns-a", "r1", "conflict").class(),
            ErrorClass::Recoverable
        );
        assert_eq!(
            Error::serialization_failed("bad value").class(),
            ErrorClass::Recoverable
        );
    }

    #[test]
    fn test_patch_error_display_carries_address() {
        let err = Error::patch_failed("ns-a", "r1", "forbidden");
        let msg = err.to_string();
        assert!(msg.contains("ns-a/r1"));
        assert!(msg.contains("forbidden"));
    }
}
