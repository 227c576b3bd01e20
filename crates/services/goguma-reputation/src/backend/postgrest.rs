use async_trait::async_trait;
use goguma_types::{FavoriteMark, Listing, ListingId, SellerId, UserId, UserProfile};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use super::MarketBackend;
use crate::error::BackendError;
use crate::metrics;

/// Default timeout for requests to the hosted database.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 5;

const CHARM_TEMPERATURE_RPC: &str = "get_charm_temperature";
const PRODUCTS: &str = "products";
const FAVORITES: &str = "favorites";
const PROFILES: &str = "profiles";

/// Client for the hosted database's PostgREST API.
///
/// One instance is built at startup and shared; `reqwest::Client` pools
/// connections internally.
pub struct PostgrestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/rest/v1/{}", self.base_url, path);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Sends `request`, records its latency, and turns non-success statuses
    /// into [`BackendError::Status`].
    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, BackendError> {
        let started = Instant::now();
        let result = request.send().await;
        metrics::observe_backend_request(operation, started.elapsed().as_secs_f64());

        let resp = result?;
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response>".to_string());
        tracing::debug!("{} failed with HTTP {}: {}", operation, status, body);
        Err(BackendError::Status { status, body })
    }

    async fn exact_count(
        &self,
        operation: &'static str,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<u64, BackendError> {
        let request = self
            .request(Method::HEAD, table)
            .query(&[("select", "id")])
            .query(filters)
            .header("Prefer", "count=exact");

        let resp = self.send(operation, request).await?;
        let content_range = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .ok_or_else(|| BackendError::Decode("missing Content-Range header".to_string()))?
            .to_str()
            .map_err(|e| BackendError::Decode(format!("unreadable Content-Range header: {}", e)))?;

        parse_content_range_total(content_range)
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

fn in_list(ids: &[ListingId]) -> String {
    let joined = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    format!("in.({})", joined)
}

/// Extracts the total from a PostgREST `Content-Range` header such as
/// `0-24/3573` or `*/0`.
pub(crate) fn parse_content_range_total(value: &str) -> Result<u64, BackendError> {
    let (_, total) = value
        .split_once('/')
        .ok_or_else(|| BackendError::Decode(format!("malformed Content-Range: {}", value)))?;

    total
        .trim()
        .parse::<u64>()
        .map_err(|_| BackendError::Decode(format!("Content-Range carries no exact total: {}", value)))
}

#[derive(Deserialize)]
struct IdRow {
    id: ListingId,
}

// `favorites` row with its listing embedded; `null` once the listing is gone.
#[derive(Deserialize)]
struct FavoritedRow {
    #[serde(default)]
    products: Option<Listing>,
}

#[async_trait]
impl MarketBackend for PostgrestBackend {
    async fn charm_temperature(&self, seller: &SellerId) -> Result<Option<f64>, BackendError> {
        let request = self
            .request(Method::POST, &format!("rpc/{}", CHARM_TEMPERATURE_RPC))
            .json(&json!({ "target_user_id": seller }));

        let resp = self.send("rpc_charm_temperature", request).await?;
        match resp.json::<Value>().await? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_f64()
                .map(Some)
                .ok_or_else(|| BackendError::Decode(format!("non-finite score: {}", n))),
            other => Err(BackendError::Decode(format!(
                "{} returned a non-numeric value: {}",
                CHARM_TEMPERATURE_RPC, other
            ))),
        }
    }

    async fn listing_ids_by_owner(&self, seller: &SellerId) -> Result<Vec<ListingId>, BackendError> {
        let request = self
            .request(Method::GET, PRODUCTS)
            .query(&[("select", "id".to_string()), ("user_id", eq(seller))]);

        let rows: Vec<IdRow> = self.send("listing_ids_by_owner", request).await?.json().await?;
        Ok(rows.into_iter().map(|row| row.id).collect())
    }

    async fn count_favorites(&self, listing_ids: &[ListingId]) -> Result<u64, BackendError> {
        if listing_ids.is_empty() {
            return Ok(0);
        }
        self.exact_count("count_favorites", FAVORITES, &[("product_id", in_list(listing_ids))])
            .await
    }

    async fn listing(&self, id: ListingId) -> Result<Option<Listing>, BackendError> {
        let request = self.request(Method::GET, PRODUCTS).query(&[
            ("select", "*".to_string()),
            ("id", eq(id)),
            ("limit", "1".to_string()),
        ]);

        let rows: Vec<Listing> = self.send("listing", request).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn listings_by_owner(&self, owner: &UserId) -> Result<Vec<Listing>, BackendError> {
        let request = self.request(Method::GET, PRODUCTS).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("order", "created_at.desc.nullslast".to_string()),
        ]);

        Ok(self.send("listings_by_owner", request).await?.json().await?)
    }

    async fn profile(&self, user: &UserId) -> Result<Option<UserProfile>, BackendError> {
        let request = self.request(Method::GET, PROFILES).query(&[
            ("select", "id,nickname,email".to_string()),
            ("id", eq(user)),
            ("limit", "1".to_string()),
        ]);

        let rows: Vec<UserProfile> = self.send("profile", request).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn favorited_listings(&self, user: &UserId) -> Result<Vec<Listing>, BackendError> {
        let request = self.request(Method::GET, FAVORITES).query(&[
            ("select", "product_id,products(*)".to_string()),
            ("user_id", eq(user)),
        ]);

        let rows: Vec<FavoritedRow> = self.send("favorited_listings", request).await?.json().await?;
        Ok(rows.into_iter().filter_map(|row| row.products).collect())
    }

    async fn add_favorite(&self, mark: &FavoriteMark) -> Result<bool, BackendError> {
        let request = self
            .request(Method::POST, FAVORITES)
            .query(&[("on_conflict", "user_id,product_id")])
            .header("Prefer", "return=representation,resolution=ignore-duplicates")
            .json(mark);

        let inserted: Vec<Value> = self.send("add_favorite", request).await?.json().await?;
        Ok(!inserted.is_empty())
    }

    async fn remove_favorite(&self, mark: &FavoriteMark) -> Result<bool, BackendError> {
        let request = self
            .request(Method::DELETE, FAVORITES)
            .query(&[
                ("user_id", eq(&mark.user_id)),
                ("product_id", eq(mark.listing_id)),
            ])
            .header("Prefer", "return=representation");

        let deleted: Vec<Value> = self.send("remove_favorite", request).await?.json().await?;
        Ok(!deleted.is_empty())
    }
}
