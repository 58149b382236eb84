/**
 * Configuration for the resource reconciliation cache
 */
/// Whether a cache waits for its initial population before notifying.
/// Steady mode is the default.
pub const DEFAULT_WAIT_FOR_ALL: bool = false;

/// Construction-time options for a `ResourceManager`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceManagerConfig {
    /// Suppress callbacks, and ignore delete/status notifications, until the
    /// first unchanged resend proves the initial listing is complete
    pub wait_for_all: bool,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self {
            wait_for_all: DEFAULT_WAIT_FOR_ALL,
        }
    }
}

impl ResourceManagerConfig {
    #[must_use]
    pub const fn with_wait_for_all(mut self, wait_for_all: bool) -> Self {
        self.wait_for_all = wait_for_all;
        self
    }
}
