pub mod config;
pub mod errors;
pub mod notification;
pub mod resource_manager;
pub mod watched;

pub use config::ResourceManagerConfig;
pub use notification::Notification;
pub use resource_manager::{CacheStats, ResourceManager};
pub use watched::WatchedResource;
