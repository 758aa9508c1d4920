//! Helm side of the annotator.
//!
//! [`HelmCliFetcher`] asks the `helm` CLI for the live state of a release.
//! Every failure (spawn, non-zero exit, unreadable output, unknown status)
//! becomes a `LookupFailed` for that release.

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod fetcher;

pub use fetcher::{HelmCliFetcher, parse_status_output};
