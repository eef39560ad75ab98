use crate::di::DependencyResolver;
use crate::error::{Result, TrellisError};
use crate::metadata::{ComponentId, MetadataStore, RoutePath, Verb};
use crate::router::BoundCallable;
use std::collections::HashSet;

/// Distinguishes terminal responder routes from middleware routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    Responder,
    Middleware,
}

/// One mountable binding: effective path, verb, the bound callable and the
/// responder/middleware flag.
#[derive(Clone)]
pub struct DispatchEntry {
    pub verb: Verb,
    pub path: RoutePath,
    pub handler_name: &'static str,
    pub callable: BoundCallable,
    pub kind: RouteKind,
}

/// The ordered set of bindings for one controller, handed to the transport
/// adapter for mounting verbatim.
pub struct DispatchTable {
    pub controller: &'static str,
    pub entries: Vec<DispatchEntry>,
}

/// Turns a controller's declared routes into a dispatch table.
///
/// Resolves the controller singleton through the dependency resolver, joins
/// prefixes onto literal paths, rejects duplicate responder routes and binds
/// each handler member to the singleton.
pub struct RouteBinder<'a> {
    store: &'a MetadataStore,
    resolver: &'a DependencyResolver,
}

impl<'a> RouteBinder<'a> {
    pub fn new(store: &'a MetadataStore, resolver: &'a DependencyResolver) -> Self {
        Self { store, resolver }
    }

    /// Bind every declared route of `controller` under `prefix`.
    ///
    /// Responder routes must be unique per `(verb, effective path)` within
    /// the controller; middleware routes are exempt and may duplicate
    /// freely. Entries come out in declaration order.
    ///
    /// # Errors
    /// - Resolution errors for the controller or its dependency graph.
    /// - [`TrellisError::RegistrationConflict`] on a duplicate responder
    ///   route.
    pub fn bind(&self, controller: ComponentId, prefix: &str) -> Result<DispatchTable> {
        let instance = self.resolver.resolve(self.store, controller)?;

        let mut seen: HashSet<(Verb, String)> = HashSet::new();
        let mut entries = Vec::new();

        for route in self.store.routes(controller) {
            let path = route.path.effective(prefix);

            let kind = if route.verb.is_middleware() {
                RouteKind::Middleware
            } else {
                RouteKind::Responder
            };

            if kind == RouteKind::Responder
                && !seen.insert((route.verb, path.key().to_string()))
            {
                return Err(TrellisError::RegistrationConflict {
                    controller: controller.name().to_string(),
                    verb: route.verb.to_string(),
                    path: path.key().to_string(),
                });
            }

            let callable = route.bind(instance.clone())?;

            tracing::debug!(
                controller = controller.name(),
                verb = route.verb.as_str(),
                path = path.key(),
                handler = route.handler_name,
                "bound route"
            );

            entries.push(DispatchEntry {
                verb: route.verb,
                path,
                handler_name: route.handler_name,
                callable,
                kind,
            });
        }

        Ok(DispatchTable {
            controller: controller.name(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{BinderFn, ComponentDescriptor, FactoryFn, RouteDescriptor};
    use crate::response::HandlerResult;
    use crate::router::BoundHandler;
    use regex::Regex;
    use std::any::Any;
    use std::sync::Arc;

    struct TodoController;

    fn controller_store(routes: Vec<(Verb, RoutePath, &'static str)>) -> MetadataStore {
        let mut store = MetadataStore::new();
        let factory: FactoryFn =
            Arc::new(|_| Ok(Arc::new(TodoController) as Arc<dyn Any + Send + Sync>));
        let id = ComponentId::of::<TodoController>();
        store.register_component(ComponentDescriptor::new(id, vec![], factory));

        for (verb, path, name) in routes {
            let binder: BinderFn = Arc::new(|_| {
                let handler: BoundHandler =
                    Arc::new(|_| Box::pin(async { Ok(HandlerResult::NoResponse) }));
                Ok(BoundCallable::Responder(handler))
            });
            store.register_route(id, RouteDescriptor::new(verb, path, name, binder));
        }
        store
    }

    fn bind(store: &MetadataStore, prefix: &str) -> Result<DispatchTable> {
        let resolver = DependencyResolver::new();
        RouteBinder::new(store, &resolver).bind(ComponentId::of::<TodoController>(), prefix)
    }

    #[test]
    fn effective_paths_join_the_prefix() {
        let store = controller_store(vec![
            (Verb::Get, "".into(), "list"),
            (Verb::Get, "/:id".into(), "find"),
            (Verb::Post, "".into(), "create"),
            (Verb::Post, "/:id/toggle".into(), "toggle"),
        ]);

        let table = bind(&store, "/api/todo").unwrap();
        let bound: Vec<(Verb, String)> = table
            .entries
            .iter()
            .map(|e| (e.verb, e.path.key().to_string()))
            .collect();

        assert_eq!(
            bound,
            vec![
                (Verb::Get, "/api/todo".to_string()),
                (Verb::Get, "/api/todo/:id".to_string()),
                (Verb::Post, "/api/todo".to_string()),
                (Verb::Post, "/api/todo/:id/toggle".to_string()),
            ]
        );
    }

    #[test]
    fn duplicate_responder_route_conflicts() {
        let store = controller_store(vec![
            (Verb::Get, "".into(), "list"),
            (Verb::Get, "".into(), "list_again"),
        ]);

        match bind(&store, "/api/todo") {
            Err(TrellisError::RegistrationConflict {
                controller, path, ..
            }) => {
                assert!(controller.contains("TodoController"));
                assert_eq!(path, "/api/todo");
            }
            other => panic!("expected conflict, got {:?}", other.map(|t| t.entries.len())),
        }
    }

    #[test]
    fn empty_and_slash_paths_share_one_slot() {
        // Both normalize to the root they would be served under.
        let store = controller_store(vec![
            (Verb::Get, "".into(), "root"),
            (Verb::Get, "/".into(), "root_slash"),
        ]);

        match bind(&store, "") {
            Err(TrellisError::RegistrationConflict { path, .. }) => assert_eq!(path, "/"),
            other => panic!("expected conflict, got {:?}", other.map(|t| t.entries.len())),
        }
    }

    #[test]
    fn same_path_different_verbs_is_allowed() {
        let store = controller_store(vec![
            (Verb::Get, "".into(), "list"),
            (Verb::Post, "".into(), "create"),
        ]);
        assert_eq!(bind(&store, "/api/todo").unwrap().entries.len(), 2);
    }

    #[test]
    fn middleware_routes_are_exempt_from_conflicts() {
        let mut store = controller_store(vec![(Verb::Get, "".into(), "list")]);
        let id = ComponentId::of::<TodoController>();
        for name in ["guard_one", "guard_two"] {
            let binder: BinderFn = Arc::new(|_| {
                let mw: crate::router::BoundMiddleware =
                    Arc::new(|req, next| Box::pin(async move { next.run(req).await }));
                Ok(BoundCallable::Middleware(mw))
            });
            store.register_route(
                id,
                RouteDescriptor::new(Verb::Middleware, "".into(), name, binder),
            );
        }

        let table = bind(&store, "/api/todo").unwrap();
        assert_eq!(table.entries.len(), 3);
        let middleware: Vec<_> = table
            .entries
            .iter()
            .filter(|e| e.kind == RouteKind::Middleware)
            .collect();
        assert_eq!(middleware.len(), 2);
        // Middleware literal paths still pick up the prefix for scoping.
        assert!(middleware.iter().all(|e| e.path.key() == "/api/todo"));
    }

    #[test]
    fn pattern_routes_keep_their_pattern_verbatim() {
        let pattern = RoutePath::pattern(Regex::new(r"^/files/\d+$").unwrap());
        let store = controller_store(vec![(Verb::Get, pattern, "file")]);

        let table = bind(&store, "/api/todo").unwrap();
        assert_eq!(table.entries[0].path.key(), r"^/files/\d+$");
        assert!(table.entries[0].path.is_pattern());
    }

    #[test]
    fn declaration_order_is_preserved() {
        let store = controller_store(vec![
            (Verb::Post, "/b".into(), "b"),
            (Verb::Get, "/a".into(), "a"),
            (Verb::Delete, "/c".into(), "c"),
        ]);
        let table = bind(&store, "").unwrap();
        let names: Vec<_> = table.entries.iter().map(|e| e.handler_name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
