use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use quota_guard::{
    middleware::{matcher::RequestMatcher, rate_limit::RateLimiter},
    models::rate_limit::RateLimitConfig,
    routes::build_router,
    services::{counter_store::CounterStore, memory_store::MemoryStore},
    utils::time::{Clock, ManualClock},
    AppState,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    store: Arc<MemoryStore>,
}

fn setup_app(page: (u64, u64), api: (u64, u64)) -> TestApp {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn CounterStore> = store.clone();
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let page_limiter = RateLimiter::new(
        "page",
        RateLimitConfig::new(page.0, page.1).expect("page config"),
        dyn_store.clone(),
    )
    .with_clock(dyn_clock.clone())
    .with_matcher(RequestMatcher::new(vec![
        "/robots.txt".to_string(),
        "/favicon.ico".to_string(),
    ]));
    let api_limiter = RateLimiter::new(
        "api",
        RateLimitConfig::new(api.0, api.1).expect("api config"),
        dyn_store.clone(),
    )
    .with_clock(dyn_clock.clone());

    let state = AppState::new(
        Arc::new(page_limiter),
        Arc::new(api_limiter),
        dyn_store,
        dyn_clock,
    );

    TestApp {
        router: build_router(state),
        clock,
        store,
    }
}

fn get(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

fn header(resp: &Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .map(|value| value.to_str().unwrap().to_string())
}

async fn json_body(resp: Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn page_quota_is_enforced_with_headers() {
    let app = setup_app((60_000, 10), (60_000, 30));

    for n in 1..=10u64 {
        let resp = app.router.clone().oneshot(get("/", "1.2.3.4")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header(&resp, "x-ratelimit-limit").as_deref(), Some("10"));
        assert_eq!(
            header(&resp, "x-ratelimit-remaining"),
            Some((10 - n).to_string())
        );
        assert_eq!(
            header(&resp, "x-ratelimit-reset").as_deref(),
            Some("1700000060")
        );
    }

    let resp = app.router.clone().oneshot(get("/dashboard", "1.2.3.4")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header(&resp, "retry-after").as_deref(), Some("60"));
    assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some("0"));
    let body = json_body(resp).await;
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["retryAfter"], 60);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn quota_returns_after_window_elapses() {
    let app = setup_app((1_000, 2), (60_000, 30));

    for _ in 0..3 {
        app.router.clone().oneshot(get("/", "5.6.7.8")).await.unwrap();
    }
    let resp = app.router.clone().oneshot(get("/", "5.6.7.8")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    app.clock.advance(1_001);
    let resp = app.router.clone().oneshot(get("/", "5.6.7.8")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some("1"));
}

#[tokio::test]
async fn exhausted_client_does_not_affect_others() {
    let app = setup_app((60_000, 1), (60_000, 30));

    app.router.clone().oneshot(get("/", "10.0.0.1")).await.unwrap();
    let blocked = app.router.clone().oneshot(get("/", "10.0.0.1")).await.unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    let other = app.router.clone().oneshot(get("/", "10.0.0.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn page_and_api_quotas_are_independent() {
    let app = setup_app((60_000, 1), (60_000, 2));

    app.router.clone().oneshot(get("/", "1.1.1.1")).await.unwrap();
    let page = app.router.clone().oneshot(get("/", "1.1.1.1")).await.unwrap();
    assert_eq!(page.status(), StatusCode::TOO_MANY_REQUESTS);

    let resp = app
        .router
        .clone()
        .oneshot(get("/api/rate-limit/status", "1.1.1.1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, "x-ratelimit-limit").as_deref(), Some("2"));
    let body = json_body(resp).await;
    assert_eq!(body["client"], "1.1.1.1");
    assert_eq!(body["limit"], 2);
    assert_eq!(body["used"], 1);
    assert_eq!(body["remaining"], 1);
    assert!(body["reset_at"].is_string());
}

#[tokio::test]
async fn excluded_paths_are_not_counted() {
    let app = setup_app((60_000, 1), (60_000, 30));

    for _ in 0..5 {
        let resp = app.router.clone().oneshot(get("/robots.txt", "2.2.2.2")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(header(&resp, "x-ratelimit-limit").is_none());
    }
    assert!(app.store.is_empty());

    let resp = app.router.clone().oneshot(get("/", "2.2.2.2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn prefetch_requests_are_not_counted() {
    let app = setup_app((60_000, 1), (60_000, 30));

    let prefetch = Request::builder()
        .uri("/dashboard")
        .header("x-real-ip", "3.3.3.3")
        .header("purpose", "prefetch")
        .body(Body::empty())
        .unwrap();
    let resp = app.router.clone().oneshot(prefetch).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header(&resp, "x-ratelimit-limit").is_none());

    let resp = app.router.clone().oneshot(get("/dashboard", "3.3.3.3")).await.unwrap();
    assert_eq!(header(&resp, "x-ratelimit-remaining").as_deref(), Some("0"));
}

#[tokio::test]
async fn anonymous_requests_share_the_unknown_bucket() {
    let app = setup_app((60_000, 2), (60_000, 30));
    let anonymous = || Request::builder().uri("/").body(Body::empty()).unwrap();

    for _ in 0..2 {
        let resp = app.router.clone().oneshot(anonymous()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let resp = app.router.clone().oneshot(anonymous()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let resp = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/rate-limit/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["client"], "unknown");
}

#[tokio::test]
async fn health_and_docs_are_not_rate_limited() {
    let app = setup_app((60_000, 1), (60_000, 1));

    for _ in 0..3 {
        let resp = app.router.clone().oneshot(get("/health", "4.4.4.4")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(header(&resp, "x-ratelimit-limit").is_none());
    }

    let resp = app
        .router
        .clone()
        .oneshot(get("/api-docs/openapi.json", "4.4.4.4"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = json_body(resp).await;
    assert!(doc["paths"]["/api/rate-limit/status"].is_object());
    assert!(doc["components"]["schemas"]["RateLimitedBody"].is_object());
}
