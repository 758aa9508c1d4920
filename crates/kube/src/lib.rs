//! Kubernetes side of the annotator.
//!
//! Declares the `FluxHelmRelease` custom resource and a
//! [`KubeResourceStore`] that enumerates namespaces, lists releases and
//! merge-patches their `status.releaseStatus`.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod crd;
pub mod store;

pub use crd::{FluxHelmRelease, FluxHelmReleaseSpec, FluxHelmReleaseStatus};
pub use store::KubeResourceStore;
