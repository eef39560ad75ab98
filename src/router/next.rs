use crate::router::{BoxFuture, HandlerError};
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

/// Represents the rest of the request pipeline from a middleware's point of
/// view: later middleware in declaration order, then the matched responder.
pub struct Next {
    run: Box<dyn FnOnce(Request<Body>) -> BoxFuture<Result<Response, HandlerError>> + Send>,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> BoxFuture<Result<Response, HandlerError>> + Send + 'static,
    {
        Self { run: Box::new(f) }
    }

    /// Hand the request to the rest of the pipeline.
    pub async fn run(self, request: Request<Body>) -> Result<Response, HandlerError> {
        (self.run)(request).await
    }
}
