// Integration tests for the HTTP API, driven against the in-memory backend.
use goguma_reputation::{
    app::create_app,
    backend::{Capability, InMemoryBackend, RpcMode},
    handlers::AppState,
    CachedReputation, Marketplace, ReputationService,
};
use goguma_types::{Listing, ListingId, ListingStatus, UserId, UserProfile};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn seeded_backend() -> Arc<InMemoryBackend> {
    Arc::new(
        InMemoryBackend::new()
            .with_listing(Listing::new(ListingId(1), UserId::from("seller-1")))
            .with_listing(
                Listing::new(ListingId(2), UserId::from("seller-1")).with_status(ListingStatus::Sold),
            )
            .with_listing(Listing::new(ListingId(3), UserId::from("seller-2")))
            .with_profile(UserProfile {
                id: UserId::from("seller-1"),
                nickname: Some("군고구마".to_string()),
                email: Some("roast@goguma.kr".to_string()),
            })
            .with_favorite("buyer-1", 1)
            .with_favorite("buyer-2", 1)
            .with_favorite("buyer-3", 2),
    )
}

// Spawns the app on a random port and returns its base URL.
async fn spawn_app(backend: Arc<InMemoryBackend>) -> (String, JoinHandle<()>) {
    let service = Arc::new(ReputationService::new(backend.clone()));
    let cache = Arc::new(CachedReputation::new(service, Duration::from_secs(60)));
    let marketplace = Arc::new(Marketplace::new(backend, cache));
    let app = create_app(AppState::new(marketplace));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let server_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (server_url, handle)
}

#[tokio::test]
async fn health_check_reports_ok() {
    let (url, _handle) = spawn_app(seeded_backend()).await;

    let body: Value = Client::new()
        .get(format!("{}/health", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn charm_temperature_uses_fallback_count() {
    let (url, _handle) = spawn_app(seeded_backend()).await;

    let resp = Client::new()
        .get(format!("{}/sellers/seller-1/charm-temperature", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["seller_id"], "seller-1");
    assert_eq!(body["temperature"], 36.8);
    assert_eq!(body["display"], "36.8°C");
    assert_eq!(body["source"], "fallback");
}

#[tokio::test]
async fn charm_temperature_prefers_aggregate() {
    let backend = seeded_backend();
    backend.set_rpc_mode(RpcMode::Fixed(41.2));
    let (url, _handle) = spawn_app(backend.clone()).await;

    let body: Value = Client::new()
        .get(format!("{}/sellers/seller-1/charm-temperature", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["temperature"], 41.2);
    assert_eq!(body["source"], "aggregate");
    assert_eq!(backend.calls(Capability::ListingLookup), 0);
}

#[tokio::test]
async fn charm_temperature_is_ok_when_backend_is_down() {
    let backend = seeded_backend();
    backend.fail(Capability::ListingLookup);
    let (url, _handle) = spawn_app(backend).await;

    let resp = Client::new()
        .get(format!("{}/sellers/seller-1/charm-temperature", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["temperature"], 36.5);
    assert_eq!(body["source"], "base");
}

#[tokio::test]
async fn seller_card_and_missing_listing() {
    let (url, _handle) = spawn_app(seeded_backend()).await;
    let client = Client::new();

    let card: Value = client
        .get(format!("{}/listings/2/seller", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(card["seller_id"], "seller-1");
    assert_eq!(card["display_name"], "군고구마");
    assert_eq!(card["display"], "36.8°C");

    let missing = client
        .get(format!("{}/listings/999/seller", url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let body: Value = missing.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("999"));

    let malformed = client
        .get(format!("{}/listings/abc/seller", url))
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_summary_and_backend_failure() {
    let backend = seeded_backend();
    let (url, _handle) = spawn_app(backend.clone()).await;
    let client = Client::new();

    let summary: Value = client
        .get(format!("{}/users/seller-1/profile", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["display_name"], "군고구마");
    assert_eq!(summary["counts"]["selling"], 1);
    assert_eq!(summary["counts"]["sold"], 1);
    assert_eq!(summary["counts"]["reserved"], 0);
    assert_eq!(summary["listings"].as_array().unwrap().len(), 2);

    let buyer: Value = client
        .get(format!("{}/users/buyer-1/profile", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(buyer["counts"]["favorites"], 1);
    assert_eq!(buyer["favorites"][0]["id"], 1);

    backend.fail(Capability::Listings);
    let resp = client
        .get(format!("{}/users/seller-1/profile", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn favorite_toggle_refreshes_cached_temperature() {
    let (url, _handle) = spawn_app(seeded_backend()).await;
    let client = Client::new();
    let temperature_url = format!("{}/sellers/seller-2/charm-temperature", url);

    let before: Value = client.get(&temperature_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(before["temperature"], 36.5);

    let added: Value = client
        .put(format!("{}/listings/3/favorites/buyer-9", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(added["favorited"], true);
    assert_eq!(added["changed"], true);

    let after: Value = client.get(&temperature_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(after["temperature"], 36.6);

    let repeated: Value = client
        .put(format!("{}/listings/3/favorites/buyer-9", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(repeated["changed"], false);

    let removed: Value = client
        .delete(format!("{}/listings/3/favorites/buyer-9", url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed["favorited"], false);
    assert_eq!(removed["changed"], true);

    let reverted: Value = client.get(&temperature_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(reverted["temperature"], 36.5);
}

#[tokio::test]
async fn metrics_endpoint_exposes_score_counters() {
    let (url, _handle) = spawn_app(seeded_backend()).await;
    let client = Client::new();

    client
        .get(format!("{}/sellers/seller-1/charm-temperature", url))
        .send()
        .await
        .unwrap();

    let resp = client.get(format!("{}/metrics", url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = resp.text().await.unwrap();
    assert!(text.contains("goguma_reputation_scores_total"));
}
