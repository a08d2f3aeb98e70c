use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header::RETRY_AFTER, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use tracing::{debug, error, warn};

use crate::dto::rate_limit_dto::RateLimitedBody;
use crate::error::Result;
use crate::middleware::chain::{forward, BoxedHandler, Handler, HandlerFuture, MiddlewareFactory};
use crate::middleware::client_ip::client_identifier;
use crate::middleware::matcher::RequestMatcher;
use crate::models::rate_limit::{ClientRequestRecord, RateLimitConfig, RateLimitOverrides};
use crate::services::counter_store::CounterStore;
use crate::utils::time::{Clock, SystemClock};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub record: ClientRequestRecord,
    pub allowed: bool,
    pub now_ms: i64,
}

/// Fixed-window limiter for one mount point.
///
/// Every limiter namespaces its keys with `scope`, so several limiters can
/// share one counter store without counting each other's traffic.
pub struct RateLimiter {
    scope: String,
    config: RateLimitConfig,
    store: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    matcher: RequestMatcher,
    fail_open: bool,
}

impl RateLimiter {
    pub fn new(
        scope: impl Into<String>,
        config: RateLimitConfig,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        Self {
            scope: scope.into(),
            config,
            store,
            clock: Arc::new(SystemClock),
            matcher: RequestMatcher::all(),
            fail_open: true,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_matcher(mut self, matcher: RequestMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// When the store fails, let requests through (`true`) or answer with
    /// the store error (`false`).
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn key(&self, client: &str) -> String {
        format!("{}:{}", self.scope, client)
    }

    /// Counts one request for `client` and decides whether it may proceed.
    /// The attempt is counted even when it ends up rejected.
    pub async fn check(&self, client: &str) -> Result<Admission> {
        let now_ms = self.clock.now_ms();
        let record = self
            .store
            .increment(&self.key(client), now_ms, self.config.window_ms)
            .await?;
        Ok(Admission {
            record,
            allowed: record.count <= self.config.max_requests,
            now_ms,
        })
    }

    /// The client's open window, without counting a request.
    pub async fn status(&self, client: &str) -> Result<Option<ClientRequestRecord>> {
        self.store.get(&self.key(client), self.clock.now_ms()).await
    }

    /// Sets the quota headers on `response`. Overwrites, so applying the same
    /// record twice is harmless. Does nothing without a response.
    pub fn decorate(&self, response: Option<&mut Response>, record: &ClientRequestRecord) {
        let Some(response) = response else {
            return;
        };
        let headers = response.headers_mut();
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.config.max_requests));
        headers.insert(
            X_RATELIMIT_REMAINING,
            HeaderValue::from(record.remaining(self.config.max_requests)),
        );
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(record.reset_at_secs()));
    }

    pub fn reject(&self, admission: &Admission) -> Response {
        let retry_after = admission.record.retry_after_secs(admission.now_ms);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(RateLimitedBody::new(retry_after)),
        )
            .into_response();
        response
            .headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        self.decorate(Some(&mut response), &admission.record);
        response
    }

    /// Runs `handler` behind the limiter.
    pub async fn handle<E, H>(&self, req: Request, event: E, handler: &H) -> Option<Response>
    where
        H: Handler<E> + ?Sized,
    {
        if !self.matcher.matches(&req) {
            return handler.call(req, event).await;
        }

        let client = client_identifier(req.headers());
        let admission = match self.check(&client).await {
            Ok(admission) => admission,
            Err(e) if self.fail_open => {
                warn!(
                    scope = %self.scope,
                    client = %client,
                    error = %e,
                    "Rate limit store failed, admitting request"
                );
                return handler.call(req, event).await;
            }
            Err(e) => {
                error!(
                    scope = %self.scope,
                    client = %client,
                    error = %e,
                    "Rate limit store failed, refusing request"
                );
                return Some(e.into_response());
            }
        };

        if !admission.allowed {
            debug!(
                scope = %self.scope,
                client = %client,
                count = admission.record.count,
                retry_after = admission.record.retry_after_secs(admission.now_ms),
                "Rate limit exceeded"
            );
            return Some(self.reject(&admission));
        }

        let mut response = handler.call(req, event).await;
        self.decorate(response.as_mut(), &admission.record);
        response
    }

    pub fn wrap<H>(self: Arc<Self>, handler: H) -> RateLimited<H> {
        RateLimited {
            limiter: self,
            handler: Arc::new(handler),
        }
    }

    /// This limiter as a link in [`chain`](crate::middleware::chain::chain).
    pub fn factory<E: Send + 'static>(self: Arc<Self>) -> MiddlewareFactory<E> {
        Box::new(move |next: BoxedHandler<E>| BoxedHandler::new(self.clone().wrap(next)))
    }
}

/// A handler guarded by a [`RateLimiter`]; callable exactly like the
/// handler it wraps.
pub struct RateLimited<H> {
    limiter: Arc<RateLimiter>,
    handler: Arc<H>,
}

impl<H> RateLimited<H> {
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

impl<H> Clone for RateLimited<H> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<H, E> Handler<E> for RateLimited<H>
where
    H: Handler<E>,
    E: Send + 'static,
{
    fn call(&self, req: Request, event: E) -> HandlerFuture {
        let limiter = self.limiter.clone();
        let handler = self.handler.clone();
        Box::pin(async move { limiter.handle(req, event, handler.as_ref()).await })
    }
}

/// Guards `handler` with the default preset, adjusted by `overrides`. The
/// merge happens here, once, not per request.
pub fn rate_limit<H>(
    handler: H,
    overrides: RateLimitOverrides,
    store: Arc<dyn CounterStore>,
) -> Result<RateLimited<H>> {
    let config = overrides.apply_to(RateLimitConfig::default())?;
    Ok(Arc::new(RateLimiter::new("default", config, store)).wrap(handler))
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    limiter
        .handle(req, next, &forward)
        .await
        .unwrap_or_else(|| StatusCode::NO_CONTENT.into_response())
}
