use crate::response::HandlerResult;
use axum::http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Pluggable body serialization hook. Defaults to `serde_json::to_string`.
pub type SerializeFn = Arc<dyn Fn(&Value) -> serde_json::Result<String> + Send + Sync>;

/// Wire-response instruction produced by classification.
#[derive(Debug, PartialEq)]
pub enum Projection {
    /// Write a serialized JSON body with the given status and headers.
    Structured {
        status: StatusCode,
        headers: HashMap<String, String>,
        body: String,
    },
    /// Redirect the client to `url`.
    Redirect { url: String },
    /// Nothing recognized and nothing written yet; the boundary renders the
    /// generic `Cannot <VERB> <path>` 404.
    Unhandled,
}

/// Classifies a responder's return value into a wire-response instruction.
///
/// Classification is total: it never errors, degrading anything it cannot
/// express to [`Projection::Unhandled`]. Middleware routes never reach the
/// projector; the dispatch layer discards their return value entirely.
#[derive(Clone)]
pub struct ResponseProjector {
    serialize: SerializeFn,
}

impl ResponseProjector {
    pub fn new() -> Self {
        Self {
            serialize: Arc::new(|value| serde_json::to_string(value)),
        }
    }

    /// Replace the serialization hook used for structured bodies.
    pub fn with_serializer(mut self, serialize: SerializeFn) -> Self {
        self.serialize = serialize;
        self
    }

    /// Classify a handler result.
    ///
    /// `already_written` reports whether the transport has already written
    /// a response for this request; when it has and nothing is recognized,
    /// there is no instruction at all (`None`) rather than a 404.
    pub fn classify(&self, result: HandlerResult, already_written: bool) -> Option<Projection> {
        match result {
            HandlerResult::Structured(entity) => {
                let (status, headers, body) = entity.into_parts();
                match (self.serialize.as_ref())(&body) {
                    Ok(body) => Some(Projection::Structured {
                        status,
                        headers,
                        body,
                    }),
                    Err(err) => {
                        tracing::error!(error = %err, "response body serialization failed");
                        Self::unhandled(already_written)
                    }
                }
            }
            HandlerResult::Redirect(view) => Some(Projection::Redirect {
                url: view.into_url(),
            }),
            HandlerResult::NoResponse => Self::unhandled(already_written),
        }
    }

    fn unhandled(already_written: bool) -> Option<Projection> {
        if already_written {
            None
        } else {
            Some(Projection::Unhandled)
        }
    }
}

impl Default for ResponseProjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{RedirectView, ResponseEntity};
    use serde_json::json;

    #[test]
    fn structured_result_serializes_body() {
        let projector = ResponseProjector::new();
        let entity = ResponseEntity::ok().body(json!({ "success": true }));

        match projector.classify(HandlerResult::Structured(entity), false) {
            Some(Projection::Structured { status, body, .. }) => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(body, r#"{"success":true}"#);
            }
            other => panic!("expected structured projection, got {other:?}"),
        }
    }

    #[test]
    fn redirect_result_carries_url() {
        let projector = ResponseProjector::new();
        let result = HandlerResult::Redirect(RedirectView::to("/login"));
        assert_eq!(
            projector.classify(result, false),
            Some(Projection::Redirect {
                url: "/login".to_string()
            })
        );
    }

    #[test]
    fn no_response_degrades_to_unhandled() {
        let projector = ResponseProjector::new();
        assert_eq!(
            projector.classify(HandlerResult::NoResponse, false),
            Some(Projection::Unhandled)
        );
    }

    #[test]
    fn no_response_after_write_yields_nothing() {
        let projector = ResponseProjector::new();
        assert_eq!(projector.classify(HandlerResult::NoResponse, true), None);
    }

    #[test]
    fn serializer_hook_is_pluggable() {
        let projector = ResponseProjector::new()
            .with_serializer(Arc::new(|value| serde_json::to_string_pretty(value)));
        let entity = ResponseEntity::ok().body(json!({ "a": 1 }));

        match projector.classify(HandlerResult::Structured(entity), false) {
            Some(Projection::Structured { body, .. }) => {
                assert!(body.contains('\n'));
            }
            other => panic!("expected structured projection, got {other:?}"),
        }
    }

    #[test]
    fn serializer_failure_degrades_instead_of_erroring() {
        use serde::ser::Error as _;
        let projector = ResponseProjector::new()
            .with_serializer(Arc::new(|_| Err(serde_json::Error::custom("sink closed"))));
        let entity = ResponseEntity::ok().body(json!({}));

        assert_eq!(
            projector.classify(HandlerResult::Structured(entity), false),
            Some(Projection::Unhandled)
        );
    }
}
