use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    add_favorite_handler, get_charm_temperature_handler, get_profile_summary_handler,
    get_seller_card_handler, health_check_handler, remove_favorite_handler, AppState,
};
use crate::metrics::metrics_handler;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check_handler))
        .route(
            "/sellers/:seller_id/charm-temperature",
            get(get_charm_temperature_handler),
        )
        .route("/listings/:listing_id/seller", get(get_seller_card_handler))
        .route(
            "/listings/:listing_id/favorites/:user_id",
            axum::routing::put(add_favorite_handler).delete(remove_favorite_handler),
        )
        .route("/users/:user_id/profile", get(get_profile_summary_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
