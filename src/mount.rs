//! Transport adapter: turns dispatch tables into an `axum::Router`.
//!
//! The routing core stays transport-agnostic; this module is the collaborator
//! that mounts a table, runs each responder's result through the projector
//! and renders the boundary pages. Axum handlers cannot write to the wire
//! before returning, so classification always runs with
//! `already_written == false` here.

use crate::error::{Result, TrellisError};
use crate::exception::{error_body, HttpStatusError};
use crate::metadata::{RoutePath, Verb};
use crate::response::{Projection, ResponseProjector};
use crate::router::{
    BoundCallable, BoundHandler, BoundMiddleware, BoxFuture, DispatchTable, HandlerError, Next,
};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::Router;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

/// Mount a single controller's dispatch table.
pub fn mount(table: DispatchTable, projector: ResponseProjector) -> Result<Router> {
    mount_all(vec![table], projector)
}

/// Mount a set of dispatch tables into one router.
///
/// Literal responder routes are wired into axum's router verbatim (with
/// `:param` segments translated to axum's `{param}` template syntax).
/// Pattern routes are matched by a regex fallback in declaration order.
/// Middleware entries run before responders for any request whose path
/// falls under their scope, first-declared first. Unmatched requests get
/// the `Cannot <VERB> <path>` 404 page.
///
/// # Errors
/// The per-controller conflict check cannot see across tables, and axum's
/// router panics on overlapping method routes. Any two responder routes
/// that would occupy the same `(verb, template)` slot, including templates
/// that only differ in parameter names, are rejected here with
/// [`TrellisError::RegistrationConflict`] instead.
pub fn mount_all(tables: Vec<DispatchTable>, projector: ResponseProjector) -> Result<Router> {
    let projector = Arc::new(projector);
    let mut router = Router::new();
    let mut patterns: Vec<PatternRoute> = Vec::new();
    let mut chain: Vec<MiddlewareEntry> = Vec::new();
    let mut mounted: HashSet<(Verb, String)> = HashSet::new();

    for table in tables {
        tracing::debug!(controller = table.controller, routes = table.entries.len(), "mounting");
        for entry in table.entries {
            match entry.callable {
                BoundCallable::Middleware(handler) => {
                    chain.push(MiddlewareEntry {
                        scope: entry.path,
                        handler,
                    });
                }
                BoundCallable::Responder(handler) => match entry.path {
                    RoutePath::Literal(path) => {
                        let Some(filter) = method_filter(entry.verb) else {
                            tracing::warn!(path = %path, "responder route with middleware verb, skipping");
                            continue;
                        };
                        if !mounted.insert((entry.verb, route_identity(&path))) {
                            return Err(TrellisError::RegistrationConflict {
                                controller: table.controller.to_string(),
                                verb: entry.verb.to_string(),
                                path: path.clone(),
                            });
                        }
                        let template = axum_template(&path);
                        let verb = entry.verb.as_str();
                        let projector = projector.clone();
                        let handler_fn = move |request: Request<Body>| {
                            let handler = handler.clone();
                            let projector = projector.clone();
                            let path = path.clone();
                            async move { run_responder(handler, request, projector, verb, path).await }
                        };
                        router = router.route(&template, on(filter, handler_fn));
                    }
                    RoutePath::Pattern(regex) => {
                        patterns.push(PatternRoute {
                            verb: entry.verb,
                            display: regex.as_str().to_string(),
                            regex,
                            handler,
                        });
                    }
                },
            }
        }
    }

    let patterns = Arc::new(patterns);
    let fallback_projector = projector.clone();
    router = router.fallback(move |request: Request<Body>| {
        let patterns = patterns.clone();
        let projector = fallback_projector.clone();
        async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            for route in patterns.iter() {
                if verb_matches(route.verb, &method) && route.regex.is_match(&path) {
                    return run_responder(
                        route.handler.clone(),
                        request,
                        projector,
                        route.verb.as_str(),
                        route.display.clone(),
                    )
                    .await;
                }
            }
            not_found(method.as_str(), &path)
        }
    });

    if !chain.is_empty() {
        let chain = Arc::new(chain);
        router = router.layer(axum::middleware::from_fn(
            move |request: Request<Body>, next: axum::middleware::Next| {
                let chain = chain.clone();
                async move {
                    let terminal = Next::new(move |request| {
                        Box::pin(async move { Ok(next.run(request).await) })
                            as BoxFuture<std::result::Result<Response, HandlerError>>
                    });
                    match run_chain(chain, 0, request, terminal).await {
                        Ok(response) => response,
                        Err(err) => error_response(err),
                    }
                }
            },
        ));
    }

    Ok(router)
}

/// Conflict key for a literal route. Parameter segments are erased down to
/// their shape, since axum's router treats `/todo/:id` and `/todo/:name`
/// as the same slot.
fn route_identity(path: &str) -> String {
    path.split('/')
        .map(|segment| if segment.starts_with(':') { "{}" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

struct PatternRoute {
    verb: Verb,
    regex: Regex,
    display: String,
    handler: BoundHandler,
}

struct MiddlewareEntry {
    scope: RoutePath,
    handler: BoundMiddleware,
}

impl MiddlewareEntry {
    fn applies_to(&self, path: &str) -> bool {
        match &self.scope {
            RoutePath::Literal(scope) => {
                scope.is_empty()
                    || scope == "/"
                    || path == scope
                    || path.starts_with(&format!("{scope}/"))
            }
            RoutePath::Pattern(regex) => regex.is_match(path),
        }
    }
}

/// Run the middleware chain from `index` onward, ending at `terminal`
/// (the matched responder, or the fallback).
fn run_chain(
    chain: Arc<Vec<MiddlewareEntry>>,
    index: usize,
    request: Request<Body>,
    terminal: Next,
) -> BoxFuture<std::result::Result<Response, HandlerError>> {
    Box::pin(async move {
        let path = request.uri().path().to_string();
        match (index..chain.len()).find(|i| chain[*i].applies_to(&path)) {
            None => terminal.run(request).await,
            Some(i) => {
                let handler = chain[i].handler.clone();
                let rest = chain.clone();
                let next = Next::new(move |request| run_chain(rest, i + 1, request, terminal));
                (handler.as_ref())(request, next).await
            }
        }
    })
}

async fn run_responder(
    handler: BoundHandler,
    request: Request<Body>,
    projector: Arc<ResponseProjector>,
    verb: &'static str,
    path: String,
) -> Response {
    match (handler.as_ref())(request).await {
        Ok(result) => match projector.classify(result, false) {
            Some(Projection::Structured {
                status,
                headers,
                body,
            }) => structured_response(status, headers, body),
            Some(Projection::Redirect { url }) => redirect_response(&url),
            Some(Projection::Unhandled) | None => not_found(verb, &path),
        },
        Err(err) => error_response(err),
    }
}

fn structured_response(
    status: StatusCode,
    headers: std::collections::HashMap<String, String>,
    body: String,
) -> Response {
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json");
    for (key, value) in &headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    match builder.body(Body::from(body)) {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "failed to build structured response");
            generic_500()
        }
    }
}

fn redirect_response(url: &str) -> Response {
    match Response::builder()
        .status(StatusCode::FOUND)
        .header(header::LOCATION, url)
        .body(Body::empty())
    {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, url, "failed to build redirect response");
            generic_500()
        }
    }
}

fn error_response(err: HandlerError) -> Response {
    if let Some(status_err) = err.downcast_ref::<HttpStatusError>() {
        tracing::warn!(
            status = %status_err.status(),
            message = status_err.message(),
            "handler raised HTTP status error"
        );
        json_response(
            status_err.status(),
            error_body(status_err.status(), status_err.message()).to_string(),
        )
    } else {
        // Full detail goes to the logging sink only; the wire body stays
        // generic.
        tracing::error!(error = %err, "unhandled handler error");
        json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").to_string(),
        )
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn generic_500() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

fn not_found(verb: &str, path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html_404(&format!("Cannot {verb} {path}")),
    )
        .into_response()
}

fn html_404(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Error</title>\n\
         </head>\n\
         <body>\n\
         <pre>{message}</pre>\n\
         </body>\n\
         </html>\n"
    )
}

fn method_filter(verb: Verb) -> Option<MethodFilter> {
    match verb {
        Verb::Get => Some(MethodFilter::GET),
        Verb::Post => Some(MethodFilter::POST),
        Verb::Put => Some(MethodFilter::PUT),
        Verb::Delete => Some(MethodFilter::DELETE),
        Verb::Patch => Some(MethodFilter::PATCH),
        Verb::Options => Some(MethodFilter::OPTIONS),
        Verb::Head => Some(MethodFilter::HEAD),
        Verb::Middleware => None,
    }
}

fn verb_matches(verb: Verb, method: &Method) -> bool {
    match verb {
        Verb::Get => method == Method::GET,
        Verb::Post => method == Method::POST,
        Verb::Put => method == Method::PUT,
        Verb::Delete => method == Method::DELETE,
        Verb::Patch => method == Method::PATCH,
        Verb::Options => method == Method::OPTIONS,
        Verb::Head => method == Method::HEAD,
        Verb::Middleware => false,
    }
}

/// Translate express-style `:param` segments to axum's `{param}` templates.
/// An empty effective path mounts at the root.
fn axum_template(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::HandlerResult;
    use crate::router::{DispatchEntry, RouteKind};

    fn get_route(path: &str) -> DispatchEntry {
        let handler: BoundHandler =
            Arc::new(|_| Box::pin(async { Ok(HandlerResult::NoResponse) }));
        DispatchEntry {
            verb: Verb::Get,
            path: RoutePath::from(path),
            handler_name: "handler",
            callable: BoundCallable::Responder(handler),
            kind: RouteKind::Responder,
        }
    }

    #[test]
    fn cross_table_duplicate_is_a_typed_error() {
        let tables = vec![
            DispatchTable {
                controller: "TodoController",
                entries: vec![get_route("/api/todo")],
            },
            DispatchTable {
                controller: "LegacyTodoController",
                entries: vec![get_route("/api/todo")],
            },
        ];

        match mount_all(tables, ResponseProjector::new()) {
            Err(TrellisError::RegistrationConflict {
                controller,
                verb,
                path,
            }) => {
                assert_eq!(controller, "LegacyTodoController");
                assert_eq!(verb, "GET");
                assert_eq!(path, "/api/todo");
            }
            Ok(_) => panic!("expected a registration conflict"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn param_segments_share_a_slot_regardless_of_name() {
        let tables = vec![
            DispatchTable {
                controller: "TodoController",
                entries: vec![get_route("/api/todo/:id")],
            },
            DispatchTable {
                controller: "LegacyTodoController",
                entries: vec![get_route("/api/todo/:name")],
            },
        ];

        assert!(mount_all(tables, ResponseProjector::new()).is_err());
    }

    #[test]
    fn route_identity_erases_parameter_names() {
        assert_eq!(route_identity("/api/todo/:id"), "/api/todo/{}");
        assert_eq!(
            route_identity("/api/todo/:id/toggle"),
            route_identity("/api/todo/:name/toggle")
        );
        assert_ne!(route_identity("/api/todo"), route_identity("/api/todo/:id"));
    }

    #[test]
    fn template_translation() {
        assert_eq!(axum_template("/api/todo"), "/api/todo");
        assert_eq!(axum_template("/api/todo/:id"), "/api/todo/{id}");
        assert_eq!(axum_template("/api/todo/:id/toggle"), "/api/todo/{id}/toggle");
        assert_eq!(axum_template(""), "/");
    }

    #[test]
    fn middleware_scope_matching() {
        let entry = MiddlewareEntry {
            scope: RoutePath::from("/api/todo"),
            handler: Arc::new(|req, next| Box::pin(async move { next.run(req).await })),
        };
        assert!(entry.applies_to("/api/todo"));
        assert!(entry.applies_to("/api/todo/7"));
        assert!(!entry.applies_to("/api/todos"));
        assert!(!entry.applies_to("/health"));

        let root = MiddlewareEntry {
            scope: RoutePath::from(""),
            handler: Arc::new(|req, next| Box::pin(async move { next.run(req).await })),
        };
        assert!(root.applies_to("/anything"));
    }

    #[test]
    fn pattern_scope_matching() {
        let entry = MiddlewareEntry {
            scope: RoutePath::pattern(Regex::new(r"^/files/\d+$").unwrap()),
            handler: Arc::new(|req, next| Box::pin(async move { next.run(req).await })),
        };
        assert!(entry.applies_to("/files/12"));
        assert!(!entry.applies_to("/files/readme"));
    }
}
