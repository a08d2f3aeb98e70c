use axum::{response::IntoResponse, Json};
use utoipa::OpenApi;

use crate::dto::rate_limit_dto::{RateLimitStatusResponse, RateLimitedBody};

#[derive(OpenApi)]
#[openapi(
    paths(crate::routes::health::health, crate::routes::rate_limit::status),
    components(schemas(RateLimitStatusResponse, RateLimitedBody))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
