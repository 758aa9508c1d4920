//! Configuration for the annotator.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::result::Result;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// How often a polling cycle may start.
    pub limiter: LimiterSettings,
    /// Bounds on individual store and release manager calls.
    pub timeouts: TimeoutSettings,
    /// Helm CLI invocation.
    pub helm: HelmSettings,
    /// Kubernetes store behaviour.
    pub kube: KubeSettings,
}

/// Rate limiter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    /// Minimum interval between cycle starts once the burst is spent.
    #[serde(rename = "interval_secs", with = "duration_secs")]
    pub interval: Duration,
    /// Number of cycles allowed to start back to back.
    pub burst: u32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            burst: 5,
        }
    }
}

/// Per-call timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Upper bound for any single store or release manager call.
    #[serde(rename = "call_timeout_secs", with = "duration_secs")]
    pub call_timeout: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            call_timeout: default_call_timeout(),
        }
    }
}

/// Settings for the `helm` CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmSettings {
    /// Path to the helm executable.
    pub binary: String,
    /// Namespace passed as `--namespace`; empty means the resource's own namespace.
    pub namespace: String,
    /// Context passed as `--kube-context`; empty means the current context.
    pub kube_context: String,
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            binary: "helm".to_string(),
            namespace: String::new(),
            kube_context: String::new(),
        }
    }
}

/// Settings for the Kubernetes resource store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubeSettings {
    /// Patch the `/status` subresource instead of the main resource.
    pub status_subresource: bool,
}

impl AnnotatorConfig {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the text is not valid TOML for this shape or
    /// fails validation.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::invalid_config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigReadFailed` if the file cannot be read and
    /// `InvalidConfig` if its content is rejected.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_read_failed(path, e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.limiter.interval.is_zero() {
            return Err(Error::invalid_config("limiter.interval_secs must be positive"));
        }
        if self.limiter.burst == 0 {
            return Err(Error::invalid_config("limiter.burst must be at least 1"));
        }
        if self.timeouts.call_timeout.is_zero() {
            return Err(Error::invalid_config(
                "timeouts.call_timeout_secs must be positive",
            ));
        }
        if self.helm.binary.trim().is_empty() {
            return Err(Error::invalid_config("helm.binary must not be empty"));
        }
        Ok(())
    }
}

const fn default_interval() -> Duration {
    Duration::from_secs(5)
}

const fn default_call_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnnotatorConfig::default();
        assert_eq!(config.limiter.interval, Duration::from_secs(5));
        assert_eq!(config.limiter.burst, 5);
        assert_eq!(config.timeouts.call_timeout, Duration::from_secs(30));
        assert_eq!(config.helm.binary, "helm");
        assert!(!config.kube.status_subresource);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = AnnotatorConfig::from_toml("");
        assert_eq!(config.ok(), Some(AnnotatorConfig::default()));
    }

    #[test]
    fn test_partial_toml_overrides_fields() {
        let config = AnnotatorConfig::from_toml(
            r#"
            [limiter]
            interval_secs = 10

            [helm]
            namespace = "flux"

            [kube]
            status_subresource = true
            "#,
        );
        assert!(config.is_ok());
        let config = config.ok();
        assert_eq!(
            config.as_ref().map(|c| c.limiter.interval),
            Some(Duration::from_secs(10))
        );
        assert_eq!(config.as_ref().map(|c| c.limiter.burst), Some(5));
        assert_eq!(
            config.as_ref().map(|c| c.helm.namespace.as_str()),
            Some("flux")
        );
        assert_eq!(config.map(|c| c.kube.status_subresource), Some(true));
    }

    #[test]
    fn test_zero_burst_rejected() {
        let result = AnnotatorConfig::from_toml("[limiter]\nburst = 0\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = AnnotatorConfig::from_toml("[limiter]\ninterval_secs = 0\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = AnnotatorConfig::from_toml("[limiter\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_file() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[timeouts]\ncall_timeout_secs = 3")?;

        let config = AnnotatorConfig::from_file(file.path())?;
        assert_eq!(config.timeouts.call_timeout, Duration::from_secs(3));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let result = AnnotatorConfig::from_file(Path::new("/nonexistent/annotator.toml"));
        assert!(matches!(result, Err(Error::ConfigReadFailed { .. })));
    }
}
