//! Charm temperature computation.
//!
//! The score is `36.5 + 0.1 × favorites received` across a seller's listings.
//! The server-side aggregate is tried first; when it is missing, errors or
//! answers `null`, the score is derived from a listing lookup followed by a
//! count-only favorite query. Lookup failures degrade to the base score, so
//! computing a score never fails.

use async_trait::async_trait;
use goguma_types::{CharmTemperature, ScoreReport, ScoreSource, SellerId};
use std::sync::Arc;

use crate::backend::MarketBackend;
use crate::metrics;

/// Anything that can produce a seller's charm temperature.
#[async_trait]
pub trait ReputationProvider: Send + Sync {
    /// Computes the score together with the path that produced it. Never fails.
    async fn temperature(&self, seller: &SellerId) -> ScoreReport;

    /// Drops any memoised score for `seller`.
    async fn invalidate(&self, _seller: &SellerId) {}
}

/// Computes charm temperatures against a [`MarketBackend`].
pub struct ReputationService {
    backend: Arc<dyn MarketBackend>,
}

impl ReputationService {
    pub fn new(backend: Arc<dyn MarketBackend>) -> Self {
        Self { backend }
    }

    /// The seller's charm temperature. Returns the base score when nothing
    /// better can be determined.
    pub async fn compute_score(&self, seller: &SellerId) -> CharmTemperature {
        self.compute(seller).await.temperature
    }

    /// Like [`compute_score`](Self::compute_score), also reporting which path
    /// produced the value.
    pub async fn compute(&self, seller: &SellerId) -> ScoreReport {
        let report = self.compute_inner(seller).await;
        metrics::record_score(report.source.as_str());
        report
    }

    async fn compute_inner(&self, seller: &SellerId) -> ScoreReport {
        if seller.is_blank() {
            tracing::debug!("Blank seller id, using base charm temperature");
            return ScoreReport::base(seller.clone());
        }

        // Any number is authoritative, zero included; only null/absence or an
        // error falls through.
        match self.backend.charm_temperature(seller).await {
            Ok(Some(value)) => {
                tracing::debug!("Aggregate charm temperature for {}: {}", seller, value);
                return ScoreReport::new(
                    seller.clone(),
                    CharmTemperature::from_value(value),
                    ScoreSource::Aggregate,
                );
            }
            Ok(None) => {
                tracing::debug!("Aggregate returned null for {}, counting favorites", seller);
            }
            Err(e) => {
                tracing::debug!("Aggregate unavailable for {} ({}), counting favorites", seller, e);
            }
        }

        self.fallback(seller).await
    }

    async fn fallback(&self, seller: &SellerId) -> ScoreReport {
        let listing_ids = match self.backend.listing_ids_by_owner(seller).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("Listing lookup failed for seller {}: {}", seller, e);
                metrics::record_fallback_failure("listing_lookup");
                return ScoreReport::base(seller.clone());
            }
        };

        if listing_ids.is_empty() {
            return ScoreReport::new(seller.clone(), CharmTemperature::base(), ScoreSource::Fallback);
        }

        match self.backend.count_favorites(&listing_ids).await {
            Ok(count) => {
                tracing::debug!(
                    "Seller {} has {} favorites across {} listings",
                    seller,
                    count,
                    listing_ids.len()
                );
                ScoreReport::new(
                    seller.clone(),
                    CharmTemperature::from_favorite_count(count),
                    ScoreSource::Fallback,
                )
            }
            Err(e) => {
                tracing::warn!("Favorite count failed for seller {}: {}", seller, e);
                metrics::record_fallback_failure("favorite_count");
                ScoreReport::base(seller.clone())
            }
        }
    }
}

#[async_trait]
impl ReputationProvider for ReputationService {
    async fn temperature(&self, seller: &SellerId) -> ScoreReport {
        self.compute(seller).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Capability, InMemoryBackend, RpcMode};
    use goguma_types::{FavoriteMark, Listing, ListingId, UserId, BASE_SCORE, INCREMENT};

    fn listing(id: i64, owner: &str) -> Listing {
        Listing::new(ListingId(id), UserId::from(owner))
    }

    fn service(backend: &Arc<InMemoryBackend>) -> ReputationService {
        ReputationService::new(backend.clone())
    }

    /// Seller S owns [L1, L2]; favorites {(U1,L1), (U2,L1), (U3,L2)}.
    fn scenario() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_listing(listing(1, "S"))
            .with_listing(listing(2, "S"))
            .with_listing(listing(3, "T"))
            .with_favorite("U1", 1)
            .with_favorite("U2", 1)
            .with_favorite("U3", 2)
            .with_favorite("U1", 3)
    }

    #[tokio::test]
    async fn scenario_counts_three_favorites() {
        let backend = Arc::new(scenario());
        let report = service(&backend).compute(&SellerId::from("S")).await;

        assert_eq!(report.temperature.value(), 36.8);
        assert_eq!(report.source, ScoreSource::Fallback);
        assert_eq!(report.display(), "36.8°C");
    }

    #[tokio::test]
    async fn seller_without_listings_skips_count_query() {
        let backend = Arc::new(scenario());
        let report = service(&backend).compute(&SellerId::from("nobody")).await;

        assert_eq!(report.temperature.value(), BASE_SCORE);
        assert_eq!(backend.calls(Capability::ListingLookup), 1);
        assert_eq!(backend.calls(Capability::FavoriteCount), 0);
    }

    #[tokio::test]
    async fn fallback_score_is_independent_of_listing_count() {
        // k = 4 favorites spread over n = 1 and n = 4 listings.
        let one_listing = Arc::new(
            InMemoryBackend::new()
                .with_listing(listing(1, "S"))
                .with_favorite("a", 1)
                .with_favorite("b", 1)
                .with_favorite("c", 1)
                .with_favorite("d", 1),
        );
        let four_listings = Arc::new(
            InMemoryBackend::new()
                .with_listing(listing(1, "S"))
                .with_listing(listing(2, "S"))
                .with_listing(listing(3, "S"))
                .with_listing(listing(4, "S"))
                .with_favorite("a", 1)
                .with_favorite("a", 2)
                .with_favorite("a", 3)
                .with_favorite("a", 4),
        );

        let seller = SellerId::from("S");
        let a = service(&one_listing).compute_score(&seller).await;
        let b = service(&four_listings).compute_score(&seller).await;
        assert_eq!(a, b);
        assert!((a.value() - (BASE_SCORE + 4.0 * INCREMENT)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn never_fails_when_any_dependency_fails() {
        let seller = SellerId::from("S");

        let aggregate_down = Arc::new(scenario());
        aggregate_down.set_rpc_mode(RpcMode::Fixed(99.0));
        aggregate_down.fail(Capability::Aggregate);
        assert_eq!(service(&aggregate_down).compute_score(&seller).await.value(), 36.8);

        let lookup_down = Arc::new(scenario());
        lookup_down.fail(Capability::ListingLookup);
        let report = service(&lookup_down).compute(&seller).await;
        assert_eq!(report.temperature.value(), BASE_SCORE);
        assert_eq!(report.source, ScoreSource::Base);

        let count_down = Arc::new(scenario());
        count_down.fail(Capability::FavoriteCount);
        let report = service(&count_down).compute(&seller).await;
        assert_eq!(report.temperature.value(), BASE_SCORE);
        assert_eq!(report.source, ScoreSource::Base);
    }

    #[tokio::test]
    async fn at_most_two_round_trips_per_path() {
        let seller = SellerId::from("S");

        let aggregate = Arc::new(scenario().with_rpc_mode(RpcMode::Computed));
        service(&aggregate).compute(&seller).await;
        assert_eq!(aggregate.total_calls(), 1);

        let fallback = Arc::new(scenario());
        service(&fallback).compute(&seller).await;
        assert_eq!(fallback.calls(Capability::ListingLookup), 1);
        assert_eq!(fallback.calls(Capability::FavoriteCount), 1);
    }

    #[tokio::test]
    async fn aggregate_value_is_returned_unchanged() {
        let backend = Arc::new(scenario().with_rpc_mode(RpcMode::Fixed(42.42)));
        let report = service(&backend).compute(&SellerId::from("S")).await;

        assert_eq!(report.temperature.value(), 42.42);
        assert_eq!(report.source, ScoreSource::Aggregate);
        assert_eq!(backend.calls(Capability::ListingLookup), 0);
    }

    #[tokio::test]
    async fn aggregate_zero_is_authoritative() {
        let backend = Arc::new(scenario().with_rpc_mode(RpcMode::Fixed(0.0)));
        let report = service(&backend).compute(&SellerId::from("S")).await;

        assert_eq!(report.temperature.value(), 0.0);
        assert_eq!(report.source, ScoreSource::Aggregate);
        assert_eq!(report.display(), "0.0°C");
    }

    #[tokio::test]
    async fn aggregate_null_falls_back() {
        let backend = Arc::new(scenario().with_rpc_mode(RpcMode::Null));
        let report = service(&backend).compute(&SellerId::from("S")).await;

        assert_eq!(report.temperature.value(), 36.8);
        assert_eq!(report.source, ScoreSource::Fallback);
    }

    #[tokio::test]
    async fn blank_seller_id_is_base_without_backend_calls() {
        let backend = Arc::new(scenario().with_rpc_mode(RpcMode::Computed));
        let report = service(&backend).compute(&SellerId::from("  ")).await;

        assert_eq!(report.temperature.value(), BASE_SCORE);
        assert_eq!(report.source, ScoreSource::Base);
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn repeated_calls_are_idempotent() {
        for mode in [RpcMode::Missing, RpcMode::Computed] {
            let backend = Arc::new(scenario().with_rpc_mode(mode));
            let service = service(&backend);
            let seller = SellerId::from("S");

            let first = service.compute(&seller).await;
            let second = service.compute(&seller).await;
            assert_eq!(first, second, "mode {:?}", mode);
        }
    }

    #[tokio::test]
    async fn one_more_favorite_adds_one_increment() {
        let seller = SellerId::from("S");

        let fallback = Arc::new(scenario());
        let service_fb = service(&fallback);
        let before = service_fb.compute_score(&seller).await.value();
        fallback.insert_favorite(FavoriteMark::new(UserId::from("U4"), ListingId(2)));
        let after = service_fb.compute_score(&seller).await.value();
        assert!((after - before - INCREMENT).abs() < 1e-9);
        assert_eq!(after, 36.9);

        let aggregate = Arc::new(scenario().with_rpc_mode(RpcMode::Computed));
        let service_ag = service(&aggregate);
        let before = service_ag.compute_score(&seller).await.value();
        aggregate.insert_favorite(FavoriteMark::new(UserId::from("U4"), ListingId(2)));
        let after = service_ag.compute_score(&seller).await.value();
        assert!(after >= before);
    }
}
