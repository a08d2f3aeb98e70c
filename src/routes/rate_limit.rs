use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json},
};

use crate::{
    dto::rate_limit_dto::{RateLimitStatusResponse, RateLimitedBody},
    error::Result,
    middleware::client_ip::client_identifier,
    AppState,
};

/// Quota state of the calling client under the API limiter. The call itself
/// counts, so `used` includes it.
#[utoipa::path(
    get,
    path = "/api/rate-limit/status",
    responses(
        (
            status = 200,
            description = "Current window for the caller",
            body = RateLimitStatusResponse
        ),
        (status = 429, description = "API quota exhausted", body = RateLimitedBody),
        (status = 503, description = "Counter store unavailable")
    )
)]
#[axum::debug_handler]
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let client = client_identifier(&headers);
    let record = state.api_limiter.status(&client).await?;
    Ok(Json(RateLimitStatusResponse::new(
        client,
        state.api_limiter.config(),
        record,
    )))
}
