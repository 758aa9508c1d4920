//! Core types, errors, and configuration for the Helm release annotator.
//!
//! This crate holds everything the other workspace crates agree on:
//!
//! - **Data model**: [`ManagedResource`], [`ReleaseName`], [`ReleaseState`],
//!   [`StatusPatch`]
//! - **Errors**: a single [`Error`] enum whose [`ErrorClass`] tells the loop
//!   whether to stop or skip
//! - **Configuration**: [`AnnotatorConfig`], loaded from TOML

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use config::{AnnotatorConfig, HelmSettings, KubeSettings, LimiterSettings, TimeoutSettings};
pub use error::{Error, ErrorClass};
pub use result::{Result, ResultExt};
pub use types::{
    DEFAULT_SCOPE, ManagedResource, ReleaseName, ReleaseState, ReleaseStatusCode, ResourceKey,
    StatusPatch,
};
