pub mod docs;
pub mod health;
pub mod pages;
pub mod rate_limit;

use axum::{
    middleware::{from_fn_with_state, Next},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    chain::{chain, chain_middleware, forward},
    cors::permissive_cors,
    rate_limit::rate_limit_middleware,
};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json));

    let api = Router::new()
        .route("/api/rate-limit/status", get(rate_limit::status))
        .layer(from_fn_with_state(
            state.api_limiter.clone(),
            rate_limit_middleware,
        ));

    let page_chain = chain::<Next, _>(vec![state.page_limiter.clone().factory()], forward);
    let pages = Router::new()
        .route("/", get(pages::index))
        .route("/dashboard", get(pages::dashboard))
        .route("/robots.txt", get(pages::robots))
        .layer(from_fn_with_state(page_chain, chain_middleware));

    base_routes
        .merge(api)
        .merge(pages)
        .with_state(state)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
}
