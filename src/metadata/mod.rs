//! Declarative facts collected at assembly time.
//!
//! The store holds two kinds of metadata: which components exist and what
//! they depend on, and which routes each controller declares. Nothing here
//! constructs instances or binds handlers; the resolver and binder consume
//! this data later, in one deterministic pass.

use crate::di::Resolved;
use crate::error::Result;
use crate::router::BoundCallable;
use regex::Regex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a component type.
///
/// Keys every registry in the crate. The captured type name is carried for
/// diagnostics only; equality and hashing go through the `TypeId`.
#[derive(Clone, Copy, Debug)]
pub struct ComponentId {
    type_id: TypeId,
    type_name: &'static str,
}

impl ComponentId {
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for ComponentId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentId {}

impl std::hash::Hash for ComponentId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// HTTP verb for a route, plus the `Middleware` pseudo-verb.
///
/// Middleware routes are bound into the dispatch table like any other route
/// but never produce a terminal response themselves; they invoke a
/// continuation instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Middleware,
}

impl Verb {
    pub fn is_middleware(&self) -> bool {
        matches!(self, Verb::Middleware)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
            Verb::Patch => "PATCH",
            Verb::Options => "OPTIONS",
            Verb::Head => "HEAD",
            Verb::Middleware => "USE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A route path: either a literal template or a regular expression.
///
/// Literal paths participate in prefix composition; pattern paths are used
/// verbatim and matched against the request path at dispatch time.
#[derive(Clone, Debug)]
pub enum RoutePath {
    Literal(String),
    Pattern(Regex),
}

impl RoutePath {
    pub fn pattern(regex: Regex) -> Self {
        RoutePath::Pattern(regex)
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, RoutePath::Pattern(_))
    }

    /// Compute the effective path under a controller prefix: literal paths
    /// are concatenated, pattern paths stay as declared. An empty join
    /// normalizes to `/`, the path it would be served under, so that `""`
    /// and `"/"` cannot alias each other past the conflict check.
    pub fn effective(&self, prefix: &str) -> RoutePath {
        match self {
            RoutePath::Literal(path) => {
                let joined = format!("{prefix}{path}");
                if joined.is_empty() {
                    RoutePath::Literal("/".to_string())
                } else {
                    RoutePath::Literal(joined)
                }
            }
            RoutePath::Pattern(regex) => RoutePath::Pattern(regex.clone()),
        }
    }

    /// Textual form used for conflict keys and error messages.
    pub fn key(&self) -> &str {
        match self {
            RoutePath::Literal(path) => path,
            RoutePath::Pattern(regex) => regex.as_str(),
        }
    }
}

impl From<&str> for RoutePath {
    fn from(path: &str) -> Self {
        RoutePath::Literal(path.to_string())
    }
}

impl From<String> for RoutePath {
    fn from(path: String) -> Self {
        RoutePath::Literal(path)
    }
}

impl From<Regex> for RoutePath {
    fn from(regex: Regex) -> Self {
        RoutePath::Pattern(regex)
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Factory that builds a component instance from its already-resolved
/// dependencies.
pub type FactoryFn = Arc<dyn Fn(&Resolved<'_>) -> Result<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// Binds a resolved controller singleton to one of its handler members,
/// producing the callable carried by the dispatch table.
pub type BinderFn = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Result<BoundCallable> + Send + Sync>;

/// A registered component: identity, ordered dependency list, and the
/// factory that constructs it once its dependencies exist.
#[derive(Clone)]
pub struct ComponentDescriptor {
    id: ComponentId,
    dependencies: Vec<ComponentId>,
    factory: FactoryFn,
}

impl ComponentDescriptor {
    pub fn new(id: ComponentId, dependencies: Vec<ComponentId>, factory: FactoryFn) -> Self {
        Self {
            id,
            dependencies,
            factory,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn dependencies(&self) -> &[ComponentId] {
        &self.dependencies
    }

    pub fn factory(&self) -> &FactoryFn {
        &self.factory
    }
}

/// One declared route on a controller: verb, path, handler member name and
/// the type-erased binder that attaches the member to the singleton.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub verb: Verb,
    pub path: RoutePath,
    pub handler_name: &'static str,
    binder: BinderFn,
}

impl RouteDescriptor {
    pub fn new(verb: Verb, path: RoutePath, handler_name: &'static str, binder: BinderFn) -> Self {
        Self {
            verb,
            path,
            handler_name,
            binder,
        }
    }

    pub fn bind(&self, instance: Arc<dyn Any + Send + Sync>) -> Result<BoundCallable> {
        (self.binder.as_ref())(instance)
    }
}

/// Registry of declarative facts, scoped to one assembly pass and dropped
/// with it.
#[derive(Default)]
pub struct MetadataStore {
    components: HashMap<ComponentId, ComponentDescriptor>,
    routes: HashMap<ComponentId, Vec<RouteDescriptor>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a component registration. The last registration for a given
    /// identity wins outright; prior dependency lists are replaced, not
    /// merged.
    pub fn register_component(&mut self, descriptor: ComponentDescriptor) {
        tracing::debug!(component = descriptor.id().name(), "registering component");
        self.components.insert(descriptor.id(), descriptor);
    }

    /// Append a route for a controller, preserving declaration order.
    pub fn register_route(&mut self, controller: ComponentId, route: RouteDescriptor) {
        tracing::debug!(
            controller = controller.name(),
            verb = route.verb.as_str(),
            path = route.path.key(),
            "registering route"
        );
        self.routes.entry(controller).or_default().push(route);
    }

    pub fn dependencies(&self, id: ComponentId) -> &[ComponentId] {
        self.components
            .get(&id)
            .map(|c| c.dependencies())
            .unwrap_or(&[])
    }

    pub fn routes(&self, controller: ComponentId) -> &[RouteDescriptor] {
        self.routes
            .get(&controller)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn descriptor(&self, id: ComponentId) -> Option<&ComponentDescriptor> {
        self.components.get(&id)
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    fn descriptor_with_deps<T: 'static>(deps: Vec<ComponentId>) -> ComponentDescriptor {
        ComponentDescriptor::new(
            ComponentId::of::<T>(),
            deps,
            Arc::new(|_| Ok(Arc::new(()) as Arc<dyn Any + Send + Sync>)),
        )
    }

    #[test]
    fn component_registration_overwrites() {
        let mut store = MetadataStore::new();
        store.register_component(descriptor_with_deps::<A>(vec![ComponentId::of::<B>()]));
        store.register_component(descriptor_with_deps::<A>(vec![]));

        assert!(store.dependencies(ComponentId::of::<A>()).is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_lookups_are_empty() {
        let store = MetadataStore::new();
        assert!(store.dependencies(ComponentId::of::<A>()).is_empty());
        assert!(store.routes(ComponentId::of::<A>()).is_empty());
    }

    #[test]
    fn routes_preserve_declaration_order() {
        let mut store = MetadataStore::new();
        let id = ComponentId::of::<A>();
        let binder: BinderFn = Arc::new(|_| {
            Err(crate::error::TrellisError::Internal("unused".to_string()))
        });
        store.register_route(id, RouteDescriptor::new(Verb::Get, "".into(), "list", binder.clone()));
        store.register_route(id, RouteDescriptor::new(Verb::Post, "".into(), "create", binder));

        let names: Vec<_> = store.routes(id).iter().map(|r| r.handler_name).collect();
        assert_eq!(names, vec!["list", "create"]);
    }

    #[test]
    fn effective_path_joins_literals_only() {
        let literal = RoutePath::from("/:id");
        assert_eq!(literal.effective("/api/todo").key(), "/api/todo/:id");

        let pattern = RoutePath::pattern(Regex::new("^/files/.*$").unwrap());
        assert_eq!(pattern.effective("/api/todo").key(), "^/files/.*$");
    }
}
