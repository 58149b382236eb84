use super::errors::{is_watch_expired, watch_stream_error};
use crate::error::Result;
use kube::api::WatchEvent;
use tracing::{debug, warn};

/// One inbound change for a watched resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<T> {
    /// The resource was added, or its spec was (possibly) changed
    Reconciled(T),
    Deleted(T),
    /// Only the status subresource changed
    StatusModified(T),
}

impl<T> Notification<T> {
    #[must_use]
    pub const fn resource(&self) -> &T {
        match self {
            Self::Reconciled(resource) | Self::Deleted(resource) | Self::StatusModified(resource) => {
                resource
            }
        }
    }

    #[must_use]
    pub fn into_resource(self) -> T {
        match self {
            Self::Reconciled(resource) | Self::Deleted(resource) | Self::StatusModified(resource) => {
                resource
            }
        }
    }
}

impl<K> Notification<K> {
    /// Maps a raw API watch event onto a cache notification.
    ///
    /// Bookmarks carry no object and yield `Ok(None)`. The API server can't
    /// tell spec changes from status changes on a plain watch, so `Modified`
    /// is always reported as `Reconciled`; the generation check in the cache
    /// sorts them out.
    ///
    /// # Errors
    ///
    /// Returns the in-band `ErrorResponse` of an `Error` event as a kube API error.
    pub fn from_watch_event(event: WatchEvent<K>) -> Result<Option<Self>> {
        match event {
            WatchEvent::Added(resource) | WatchEvent::Modified(resource) => {
                Ok(Some(Self::Reconciled(resource)))
            }
            WatchEvent::Deleted(resource) => Ok(Some(Self::Deleted(resource))),
            WatchEvent::Bookmark(_) => {
                debug!("🔖 Watch bookmark");
                Ok(None)
            }
            WatchEvent::Error(response) => {
                let err = watch_stream_error(response);
                if is_watch_expired(&err) {
                    warn!("⏰ Watch expired, the stream must be re-listed: {}", err);
                }
                Err(err)
            }
        }
    }
}
