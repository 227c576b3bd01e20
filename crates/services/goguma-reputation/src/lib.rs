//! Charm temperature (매력온도) service for the 고구마마켓 second-hand marketplace.

pub mod app;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod marketplace;
pub mod metrics;
pub mod reputation;

pub use backend::{InMemoryBackend, MarketBackend, PostgrestBackend};
pub use cache::{spawn_cache_cleanup_task, CachedReputation};
pub use config::ServiceConfig;
pub use error::{ApiError, BackendError, MarketplaceError};
pub use marketplace::Marketplace;
pub use reputation::{ReputationProvider, ReputationService};
