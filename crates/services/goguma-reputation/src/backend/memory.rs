use async_trait::async_trait;
use goguma_types::{CharmTemperature, FavoriteMark, Listing, ListingId, SellerId, UserId, UserProfile};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::MarketBackend;
use crate::error::BackendError;

/// Backend capabilities that can be failed or counted individually.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Capability {
    Aggregate,
    ListingLookup,
    FavoriteCount,
    Listings,
    Profiles,
    FavoriteWrites,
}

/// How the `get_charm_temperature` function behaves.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum RpcMode {
    /// The function is not deployed.
    #[default]
    Missing,
    /// The function exists but answers `null`.
    Null,
    /// The function applies the base + increment formula server-side.
    Computed,
    /// The function answers a fixed value for every seller.
    Fixed(f64),
}

/// In-process marketplace store used by tests and local development.
#[derive(Default)]
pub struct InMemoryBackend {
    listings: RwLock<HashMap<ListingId, Listing>>,
    favorites: RwLock<HashSet<FavoriteMark>>,
    profiles: RwLock<HashMap<UserId, UserProfile>>,
    rpc_mode: RwLock<RpcMode>,
    failing: RwLock<HashSet<Capability>>,
    calls: Mutex<HashMap<Capability, usize>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rpc_mode(self, mode: RpcMode) -> Self {
        self.set_rpc_mode(mode);
        self
    }

    pub fn with_listing(self, listing: Listing) -> Self {
        self.insert_listing(listing);
        self
    }

    pub fn with_profile(self, profile: UserProfile) -> Self {
        self.insert_profile(profile);
        self
    }

    pub fn with_favorite(self, user: &str, listing: i64) -> Self {
        self.insert_favorite(FavoriteMark::new(UserId::from(user), ListingId(listing)));
        self
    }

    pub fn set_rpc_mode(&self, mode: RpcMode) {
        *write(&self.rpc_mode) = mode;
    }

    pub fn insert_listing(&self, listing: Listing) {
        write(&self.listings).insert(listing.id, listing);
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        write(&self.profiles).insert(profile.id.clone(), profile);
    }

    /// Returns `false` when the pair was already present.
    pub fn insert_favorite(&self, mark: FavoriteMark) -> bool {
        write(&self.favorites).insert(mark)
    }

    /// Makes every subsequent call to `capability` fail.
    pub fn fail(&self, capability: Capability) {
        write(&self.failing).insert(capability);
    }

    pub fn recover(&self, capability: Capability) {
        write(&self.failing).remove(&capability);
    }

    /// Number of calls made to `capability` so far, failed ones included.
    pub fn calls(&self, capability: Capability) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&capability)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of round-trips across all capabilities.
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .sum()
    }

    fn enter(&self, capability: Capability) -> Result<(), BackendError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(capability)
            .or_insert(0) += 1;

        if read(&self.failing).contains(&capability) {
            return Err(BackendError::Unavailable(format!("{:?} is failing", capability)));
        }
        Ok(())
    }

    fn owned_ids(&self, owner: &UserId) -> Vec<ListingId> {
        read(&self.listings)
            .values()
            .filter(|listing| &listing.owner == owner)
            .map(|listing| listing.id)
            .collect()
    }

    fn favorites_on(&self, ids: &[ListingId]) -> u64 {
        let ids: HashSet<&ListingId> = ids.iter().collect();
        read(&self.favorites)
            .iter()
            .filter(|mark| ids.contains(&mark.listing_id))
            .count() as u64
    }
}

#[async_trait]
impl MarketBackend for InMemoryBackend {
    async fn charm_temperature(&self, seller: &SellerId) -> Result<Option<f64>, BackendError> {
        self.enter(Capability::Aggregate)?;
        let mode = *read(&self.rpc_mode);
        match mode {
            RpcMode::Missing => Err(BackendError::Status {
                status: 404,
                body: "function get_charm_temperature does not exist".to_string(),
            }),
            RpcMode::Null => Ok(None),
            RpcMode::Fixed(value) => Ok(Some(value)),
            RpcMode::Computed => {
                let count = self.favorites_on(&self.owned_ids(seller));
                Ok(Some(CharmTemperature::from_favorite_count(count).value()))
            }
        }
    }

    async fn listing_ids_by_owner(&self, seller: &SellerId) -> Result<Vec<ListingId>, BackendError> {
        self.enter(Capability::ListingLookup)?;
        Ok(self.owned_ids(seller))
    }

    async fn count_favorites(&self, listing_ids: &[ListingId]) -> Result<u64, BackendError> {
        self.enter(Capability::FavoriteCount)?;
        Ok(self.favorites_on(listing_ids))
    }

    async fn listing(&self, id: ListingId) -> Result<Option<Listing>, BackendError> {
        self.enter(Capability::Listings)?;
        Ok(read(&self.listings).get(&id).cloned())
    }

    async fn listings_by_owner(&self, owner: &UserId) -> Result<Vec<Listing>, BackendError> {
        self.enter(Capability::Listings)?;
        let mut owned: Vec<Listing> = read(&self.listings)
            .values()
            .filter(|listing| &listing.owner == owner)
            .cloned()
            .collect();
        // Newest first; undated rows last, ties broken by id for a stable order.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(owned)
    }

    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>, BackendError> {
        self.enter(Capability::Profiles)?;
        Ok(read(&self.profiles).get(user).cloned())
    }

    async fn favorited_listings(&self, user: &UserId) -> Result<Vec<Listing>, BackendError> {
        self.enter(Capability::Listings)?;
        let listings = read(&self.listings);
        Ok(read(&self.favorites)
            .iter()
            .filter(|mark| &mark.user_id == user)
            .filter_map(|mark| listings.get(&mark.listing_id).cloned())
            .collect())
    }

    async fn add_favorite(&self, mark: &FavoriteMark) -> Result<bool, BackendError> {
        self.enter(Capability::FavoriteWrites)?;
        Ok(write(&self.favorites).insert(mark.clone()))
    }

    async fn remove_favorite(&self, mark: &FavoriteMark) -> Result<bool, BackendError> {
        self.enter(Capability::FavoriteWrites)?;
        Ok(write(&self.favorites).remove(mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goguma_types::ListingStatus;

    fn listing(id: i64, owner: &str) -> Listing {
        Listing::new(ListingId(id), UserId::from(owner))
    }

    #[tokio::test]
    async fn duplicate_favorites_are_rejected() {
        let backend = InMemoryBackend::new().with_listing(listing(1, "s"));
        let mark = FavoriteMark::new(UserId::from("u"), ListingId(1));

        assert!(backend.add_favorite(&mark).await.unwrap());
        assert!(!backend.add_favorite(&mark).await.unwrap());
        assert_eq!(backend.count_favorites(&[ListingId(1)]).await.unwrap(), 1);
        assert!(backend.remove_favorite(&mark).await.unwrap());
        assert!(!backend.remove_favorite(&mark).await.unwrap());
    }

    #[tokio::test]
    async fn failing_capability_still_counts_the_call() {
        let backend = InMemoryBackend::new();
        backend.fail(Capability::ListingLookup);

        assert!(backend.listing_ids_by_owner(&UserId::from("s")).await.is_err());
        assert_eq!(backend.calls(Capability::ListingLookup), 1);

        backend.recover(Capability::ListingLookup);
        assert!(backend.listing_ids_by_owner(&UserId::from("s")).await.is_ok());
        assert_eq!(backend.total_calls(), 2);
    }

    #[tokio::test]
    async fn computed_rpc_applies_formula() {
        let backend = InMemoryBackend::new()
            .with_rpc_mode(RpcMode::Computed)
            .with_listing(listing(1, "s"))
            .with_listing(listing(2, "other"))
            .with_favorite("u1", 1)
            .with_favorite("u2", 2);

        let score = backend.charm_temperature(&UserId::from("s")).await.unwrap();
        assert_eq!(score, Some(36.6));
    }

    #[tokio::test]
    async fn listings_by_owner_is_newest_first() {
        let older = listing(1, "s").with_status(ListingStatus::Sold);
        let mut newer = listing(2, "s");
        newer.created_at = Some(chrono::Utc::now());
        let backend = InMemoryBackend::new().with_listing(older).with_listing(newer);

        let ids: Vec<_> = backend
            .listings_by_owner(&UserId::from("s"))
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec![ListingId(2), ListingId(1)]);
    }
}
