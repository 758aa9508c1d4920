//! Status reconciliation loop for Helm-backed custom resources.
//!
//! This crate keeps the `releaseStatus` recorded on each managed resource in
//! step with the live status of the release it describes:
//!
//! - **Rate limiter**: bounds how often a cycle may start
//! - **Scope / resource enumeration**: lists namespaces, then the managed
//!   resources inside each
//! - **Release lookup**: asks the release manager for the live status
//! - **Status reconciler**: patches the recorded status when it drifts
//! - **Loop controller**: drives the cycle until stopped
//!
//! # Failure policy
//!
//! Enumeration failures (scopes, resources, limiter abort) stop the loop:
//! without a full listing a resource could be skipped silently. Lookup and
//! patch failures only skip the resource they concern; the next cycle
//! retries it.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use annotator_reconciler::{
//!     InMemoryReleaseManager, InMemoryResourceStore, LoopConfig, LoopController,
//! };
//!
//! #[tokio::main]
//! async fn main() -> annotator_core::Result<()> {
//!     let store = Arc::new(InMemoryResourceStore::new());
//!     let releases = Arc::new(InMemoryReleaseManager::new());
//!
//!     let mut controller = LoopController::builder()
//!         .with_store(store)
//!         .with_releases(releases)
//!         .with_config(LoopConfig::default())
//!         .build()?;
//!
//!     let stopper = controller.stopper();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         stopper.stop();
//!     });
//!
//!     let outcome = controller.run().await;
//!     println!("stopped: {}", outcome.reason);
//!     Ok(())
//! }
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod r#loop;
pub mod memory;
pub mod provider;
pub mod rate_limiter;
pub mod reconciler;
pub mod types;

// Re-export main types
pub use memory::{InMemoryReleaseManager, InMemoryResourceStore, RecordedPatch};
pub use provider::{
    DefaultReleaseNamer, ReleaseNamer, ReleaseStateFetcher, ResourceLister, ScopeEnumerator,
    StatusPatcher,
};
pub use r#loop::{LoopConfig, LoopController, LoopControllerBuilder, LoopStopper};
pub use rate_limiter::{RateLimitConfig, RateLimitError, RateLimiter};
pub use reconciler::StatusReconciler;
pub use types::{CycleReport, CycleTotals, LoopOutcome, LoopState, ReconcileOutcome, StopReason};
