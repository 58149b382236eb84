//! Generation-aware reconciliation cache for Kubernetes operators.
//!
//! A [`ResourceManager`] mirrors one watched resource kind and decides, for
//! every inbound notification, whether the reconcile callback needs to run.

pub mod error;
pub mod k8s;

pub use error::{Error, Result};
pub use k8s::cache::{
    CacheStats, Notification, ResourceManager, ResourceManagerConfig, WatchedResource,
};
