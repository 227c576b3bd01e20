//! Access to the hosted marketplace database.
//!
//! The reputation logic only needs the first three capabilities; the rest
//! back the seller card, profile dashboard and favorite toggling.

pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use goguma_types::{FavoriteMark, Listing, ListingId, SellerId, UserId, UserProfile};

use crate::error::BackendError;

pub use memory::{Capability, InMemoryBackend, RpcMode};
pub use postgrest::PostgrestBackend;

#[async_trait]
pub trait MarketBackend: Send + Sync + 'static {
    /// Server-side aggregate (`get_charm_temperature`). `Ok(None)` when the
    /// function answered `null`.
    async fn charm_temperature(&self, seller: &SellerId) -> Result<Option<f64>, BackendError>;

    /// Identifiers of every listing owned by `seller`, in no particular order.
    async fn listing_ids_by_owner(&self, seller: &SellerId) -> Result<Vec<ListingId>, BackendError>;

    /// Number of favorite marks referencing any of `listing_ids`. Count only,
    /// no rows are transferred.
    async fn count_favorites(&self, listing_ids: &[ListingId]) -> Result<u64, BackendError>;

    async fn listing(&self, id: ListingId) -> Result<Option<Listing>, BackendError>;

    /// Listings owned by `owner`, newest first.
    async fn listings_by_owner(&self, owner: &UserId) -> Result<Vec<Listing>, BackendError>;

    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>, BackendError>;

    /// Listings `user` has favorited, in no particular order. Marks whose
    /// listing no longer exists are skipped.
    async fn favorited_listings(&self, user: &UserId) -> Result<Vec<Listing>, BackendError>;

    /// Returns `false` when the mark already existed.
    async fn add_favorite(&self, mark: &FavoriteMark) -> Result<bool, BackendError>;

    /// Returns `false` when there was nothing to remove.
    async fn remove_favorite(&self, mark: &FavoriteMark) -> Result<bool, BackendError>;
}
