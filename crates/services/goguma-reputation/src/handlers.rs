use axum::{
    extract::{Path as AxumPath, State},
    Json,
};
use goguma_types::{ListingId, ScoreSource, SellerId, UserId};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::marketplace::{FavoriteChange, Marketplace, ProfileSummary, SellerCard};

#[derive(Clone)]
pub struct AppState {
    pub marketplace: Arc<Marketplace>,
}

impl AppState {
    pub fn new(marketplace: Arc<Marketplace>) -> Self {
        Self { marketplace }
    }
}

#[derive(Debug, Serialize)]
pub struct TemperatureResponse {
    pub seller_id: SellerId,
    pub temperature: f64,
    pub display: String,
    pub source: ScoreSource,
}

fn parse_listing_id(raw: &str) -> Result<ListingId, ApiError> {
    raw.parse()
        .map_err(|e: goguma_types::IdError| ApiError::BadRequest(e.to_string()))
}

pub async fn health_check_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Never errors: an unreachable backend yields the base temperature.
pub async fn get_charm_temperature_handler(
    AxumPath(seller_id): AxumPath<String>,
    State(state): State<AppState>,
) -> Json<TemperatureResponse> {
    let seller = SellerId::new(seller_id);
    let report = state.marketplace.reputation().temperature(&seller).await;
    Json(TemperatureResponse {
        display: report.display(),
        temperature: report.temperature.value(),
        source: report.source,
        seller_id: report.seller_id,
    })
}

pub async fn get_seller_card_handler(
    AxumPath(listing_id): AxumPath<String>,
    State(state): State<AppState>,
) -> Result<Json<SellerCard>, ApiError> {
    let listing_id = parse_listing_id(&listing_id)?;
    let card = state.marketplace.seller_card(listing_id).await?;
    Ok(Json(card))
}

pub async fn get_profile_summary_handler(
    AxumPath(user_id): AxumPath<String>,
    State(state): State<AppState>,
) -> Result<Json<ProfileSummary>, ApiError> {
    let summary = state
        .marketplace
        .profile_summary(&UserId::new(user_id))
        .await?;
    Ok(Json(summary))
}

pub async fn add_favorite_handler(
    AxumPath((listing_id, user_id)): AxumPath<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<FavoriteChange>, ApiError> {
    set_favorite(&state, &listing_id, user_id, true).await
}

pub async fn remove_favorite_handler(
    AxumPath((listing_id, user_id)): AxumPath<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<FavoriteChange>, ApiError> {
    set_favorite(&state, &listing_id, user_id, false).await
}

async fn set_favorite(
    state: &AppState,
    listing_id: &str,
    user_id: String,
    on: bool,
) -> Result<Json<FavoriteChange>, ApiError> {
    let listing_id = parse_listing_id(listing_id)?;
    let change = state
        .marketplace
        .set_favorite(&UserId::new(user_id), listing_id, on)
        .await?;
    Ok(Json(change))
}
