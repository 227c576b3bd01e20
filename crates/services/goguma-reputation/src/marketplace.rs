//! Read views behind the product-detail seller card and the profile
//! dashboard, plus favorite toggling. Each view asks the reputation provider
//! for the charm temperature instead of computing it itself.

use goguma_types::{
    profile::display_name, FavoriteMark, Listing, ListingId, ListingStatus, ScoreSource, UserId,
    UserProfile,
};
use serde::Serialize;
use std::sync::Arc;

use crate::backend::MarketBackend;
use crate::error::MarketplaceError;
use crate::reputation::ReputationProvider;

/// Seller block shown on a product detail page.
#[derive(Debug, Clone, Serialize)]
pub struct SellerCard {
    pub listing_id: ListingId,
    pub seller_id: UserId,
    pub display_name: String,
    pub temperature: f64,
    pub display: String,
    pub source: ScoreSource,
}

/// Tab counters of the profile dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub selling: usize,
    pub reserved: usize,
    pub sold: usize,
    pub favorites: usize,
}

impl TabCounts {
    fn from_listings(listings: &[Listing], favorites: &[Listing]) -> Self {
        let mut counts = TabCounts {
            favorites: favorites.len(),
            ..TabCounts::default()
        };
        for listing in listings {
            match listing.status {
                ListingStatus::Selling => counts.selling += 1,
                ListingStatus::Reserved => counts.reserved += 1,
                ListingStatus::Sold => counts.sold += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub user_id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    pub temperature: f64,
    pub display: String,
    pub counts: TabCounts,
    /// Newest first.
    pub listings: Vec<Listing>,
    /// Listings the user has favorited, newest first.
    pub favorites: Vec<Listing>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteChange {
    pub listing_id: ListingId,
    pub user_id: UserId,
    pub favorited: bool,
    /// False when the favorite was already in the requested state.
    pub changed: bool,
}

pub struct Marketplace {
    backend: Arc<dyn MarketBackend>,
    reputation: Arc<dyn ReputationProvider>,
}

impl Marketplace {
    pub fn new(backend: Arc<dyn MarketBackend>, reputation: Arc<dyn ReputationProvider>) -> Self {
        Self { backend, reputation }
    }

    pub fn reputation(&self) -> &Arc<dyn ReputationProvider> {
        &self.reputation
    }

    // A missing profile only costs the display name; never fail the view.
    async fn profile_or_none(&self, user: &UserId) -> Option<UserProfile> {
        match self.backend.profile(user).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!("Profile lookup failed for {}: {}", user, e);
                None
            }
        }
    }

    pub async fn seller_card(&self, listing_id: ListingId) -> Result<SellerCard, MarketplaceError> {
        let listing = self
            .backend
            .listing(listing_id)
            .await?
            .ok_or(MarketplaceError::ListingNotFound(listing_id))?;

        let (profile, report) = tokio::join!(
            self.profile_or_none(&listing.owner),
            self.reputation.temperature(&listing.owner)
        );

        Ok(SellerCard {
            listing_id,
            display_name: display_name(profile.as_ref()),
            temperature: report.temperature.value(),
            display: report.display(),
            source: report.source,
            seller_id: listing.owner,
        })
    }

    pub async fn profile_summary(&self, user: &UserId) -> Result<ProfileSummary, MarketplaceError> {
        if user.is_blank() {
            return Err(MarketplaceError::BlankUser);
        }

        let (profile, listings, favorites, report) = tokio::join!(
            self.profile_or_none(user),
            self.backend.listings_by_owner(user),
            self.backend.favorited_listings(user),
            self.reputation.temperature(user)
        );
        let listings = listings?;
        let mut favorites = favorites?;
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(ProfileSummary {
            user_id: user.clone(),
            display_name: display_name(profile.as_ref()),
            email: profile.and_then(|p| p.email),
            temperature: report.temperature.value(),
            display: report.display(),
            counts: TabCounts::from_listings(&listings, &favorites),
            listings,
            favorites,
        })
    }

    /// Adds (`on = true`) or removes the user's favorite on a listing and
    /// invalidates the owner's cached temperature when something changed.
    pub async fn set_favorite(
        &self,
        user: &UserId,
        listing_id: ListingId,
        on: bool,
    ) -> Result<FavoriteChange, MarketplaceError> {
        if user.is_blank() {
            return Err(MarketplaceError::BlankUser);
        }

        let listing = self
            .backend
            .listing(listing_id)
            .await?
            .ok_or(MarketplaceError::ListingNotFound(listing_id))?;

        let mark = FavoriteMark::new(user.clone(), listing_id);
        let changed = if on {
            self.backend.add_favorite(&mark).await?
        } else {
            self.backend.remove_favorite(&mark).await?
        };

        if changed {
            tracing::info!(
                "User {} {} listing {} of seller {}",
                user,
                if on { "favorited" } else { "unfavorited" },
                listing_id,
                listing.owner
            );
            self.reputation.invalidate(&listing.owner).await;
        }

        Ok(FavoriteChange {
            listing_id,
            user_id: user.clone(),
            favorited: on,
            changed,
        })
    }
}
