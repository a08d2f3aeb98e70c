use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub type HandlerFuture = Pin<Box<dyn Future<Output = Option<Response>> + Send>>;

/// A request handler that may decline to produce a response.
///
/// `E` is an opaque per-request token (an execution context, or axum's
/// `Next`) handed through to the handler untouched. Returning `None` means
/// "nothing to send, let the request continue".
pub trait Handler<E>: Send + Sync + 'static {
    fn call(&self, req: Request, event: E) -> HandlerFuture;
}

impl<F, Fut, E> Handler<E> for F
where
    F: Fn(Request, E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Response>> + Send + 'static,
{
    fn call(&self, req: Request, event: E) -> HandlerFuture {
        Box::pin(self(req, event))
    }
}

/// Type-erased, cheaply clonable handler.
pub struct BoxedHandler<E>(Arc<dyn Handler<E>>);

impl<E> BoxedHandler<E> {
    pub fn new<H: Handler<E>>(handler: H) -> Self {
        Self(Arc::new(handler))
    }
}

impl<E> Clone for BoxedHandler<E> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<E: 'static> Handler<E> for BoxedHandler<E> {
    fn call(&self, req: Request, event: E) -> HandlerFuture {
        self.0.call(req, event)
    }
}

/// Wraps the next handler in the chain.
pub type MiddlewareFactory<E> = Box<dyn Fn(BoxedHandler<E>) -> BoxedHandler<E> + Send + Sync>;

/// Composes middleware so that `factories[0]` runs first and `terminal`
/// runs last. Whatever `terminal` returns flows back out through every
/// factory, so outer links can decorate it.
pub fn chain<E, H>(factories: Vec<MiddlewareFactory<E>>, terminal: H) -> BoxedHandler<E>
where
    E: Send + 'static,
    H: Handler<E>,
{
    factories
        .into_iter()
        .rev()
        .fold(BoxedHandler::new(terminal), |next, factory| factory(next))
}

/// Terminal for chains mounted in axum: hands the request to the router.
pub async fn forward(req: Request, next: Next) -> Option<Response> {
    Some(next.run(req).await)
}

/// Runs a composed chain as axum middleware. A chain that produces nothing
/// answers 204.
pub async fn chain_middleware(
    State(handler): State<BoxedHandler<Next>>,
    req: Request,
    next: Next,
) -> Response {
    handler
        .call(req, next)
        .await
        .unwrap_or_else(|| StatusCode::NO_CONTENT.into_response())
}
