mod entity;
mod projector;

pub use entity::{RedirectView, ResponseEntity, ResponseEntityBuilder};
pub use projector::{Projection, ResponseProjector, SerializeFn};

/// Closed result type for responder handlers.
///
/// Handlers return one of exactly three shapes; there is no runtime type
/// probing of arbitrary return values. Anything a handler cannot express
/// here is `NoResponse`, which the boundary renders as a generic 404.
#[derive(Debug)]
pub enum HandlerResult {
    /// A structured wire response: status, headers, serializable body.
    Structured(ResponseEntity),
    /// An HTTP redirect to the given URL.
    Redirect(RedirectView),
    /// The handler produced nothing the projector recognizes.
    NoResponse,
}

impl From<ResponseEntity> for HandlerResult {
    fn from(entity: ResponseEntity) -> Self {
        HandlerResult::Structured(entity)
    }
}

impl From<RedirectView> for HandlerResult {
    fn from(view: RedirectView) -> Self {
        HandlerResult::Redirect(view)
    }
}
