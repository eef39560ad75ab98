mod binder;
mod next;

pub use binder::{DispatchEntry, DispatchTable, RouteBinder, RouteKind};
pub use next::Next;

use crate::response::HandlerResult;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Type-erased error raised inside a bound handler during request
/// processing. Not caught by this layer; it propagates unmodified to the
/// boundary error handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A responder handler bound to its controller singleton.
pub type BoundHandler =
    Arc<dyn Fn(Request<Body>) -> BoxFuture<Result<HandlerResult, HandlerError>> + Send + Sync>;

/// A middleware handler bound to its controller singleton. Receives the
/// continuation and is expected to invoke it (or short-circuit with its own
/// response); its return value is never projected.
pub type BoundMiddleware =
    Arc<dyn Fn(Request<Body>, Next) -> BoxFuture<Result<Response, HandlerError>> + Send + Sync>;

/// The callable carried by a dispatch entry.
#[derive(Clone)]
pub enum BoundCallable {
    Responder(BoundHandler),
    Middleware(BoundMiddleware),
}
