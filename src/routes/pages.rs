use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse},
};

#[axum::debug_handler]
pub async fn index() -> impl IntoResponse {
    Html("<!doctype html><title>quota-guard</title><h1>Welcome</h1>")
}

#[axum::debug_handler]
pub async fn dashboard() -> impl IntoResponse {
    Html("<!doctype html><title>Dashboard</title><h1>Dashboard</h1>")
}

#[axum::debug_handler]
pub async fn robots() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "User-agent: *\nDisallow: /api/\n",
    )
}
