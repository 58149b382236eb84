use kube::{Resource, ResourceExt};

/// A resource the reconciliation cache can track.
///
/// The cache only ever looks at the identity and the spec revision; the rest
/// of the payload is opaque to it. Two values with the same name and the same
/// generation are treated as identical, so status-only updates that don't
/// bump the generation are invisible to change detection.
pub trait WatchedResource: Clone + Send + Sync + 'static {
    /// Unique key within one cache
    fn name(&self) -> String;

    /// Monotonically non-decreasing spec revision
    fn generation(&self) -> i64;
}

/// Any Kubernetes object is watchable: `metadata.name` (or `generateName`
/// when the server hasn't assigned one yet) and `metadata.generation`.
impl<K> WatchedResource for K
where
    K: Resource + Clone + Send + Sync + 'static,
{
    fn name(&self) -> String {
        self.name_any()
    }

    fn generation(&self) -> i64 {
        self.meta().generation.unwrap_or_default()
    }
}
