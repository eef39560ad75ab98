use crate::di::{DependencyResolver, Injectable, Resolved};
use crate::error::Result;
use crate::metadata::{
    BinderFn, ComponentDescriptor, ComponentId, FactoryFn, MetadataStore, RouteDescriptor,
    RoutePath, Verb,
};
use crate::response::HandlerResult;
use crate::router::{
    BoundCallable, BoundHandler, BoundMiddleware, DispatchTable, HandlerError, Next, RouteBinder,
};
use crate::TrellisError;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Explicit assembly pass: collect component and route declarations as
/// plain data, then materialize everything with one deterministic
/// [`assemble`](Assembly::assemble) call.
///
/// The whole registry is scoped to this value; dropping it drops every
/// descriptor and singleton it produced.
///
/// # Example
/// ```no_run
/// use trellis::{Assembly, ResponseEntity, Verb};
/// use serde_json::json;
/// # use trellis::{Injectable, Resolved, Result};
/// # struct TodoController;
/// # impl Injectable for TodoController {
/// #     fn construct(_: &Resolved<'_>) -> Result<Self> { Ok(TodoController) }
/// # }
/// # impl TodoController {
/// #     async fn list(&self) -> ResponseEntity {
/// #         ResponseEntity::ok().body(json!([]))
/// #     }
/// # }
///
/// let mut assembly = Assembly::new();
/// assembly
///     .controller::<TodoController>("/api/todo")
///     .route(Verb::Get, "", "list", |c, _req| async move {
///         Ok(c.list().await.into())
///     });
/// let tables = assembly.assemble().unwrap();
/// ```
#[derive(Default)]
pub struct Assembly {
    store: MetadataStore,
    resolver: DependencyResolver,
    controllers: Vec<(ComponentId, String)>,
    invalid_routes: Vec<(&'static str, &'static str)>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component by its [`Injectable`] implementation.
    /// Re-registering the same type overwrites the earlier declaration.
    pub fn provide<T: Injectable>(&mut self) -> &mut Self {
        self.store.register_component(descriptor_of::<T>());
        self
    }

    /// Register a component from an explicit dependency list and factory
    /// closure, for types that cannot implement [`Injectable`] themselves.
    pub fn provide_with<T, F>(&mut self, dependencies: Vec<ComponentId>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolved<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let factory: FactoryFn =
            Arc::new(move |deps| Ok(Arc::new(factory(deps)?) as Arc<dyn Any + Send + Sync>));
        self.store.register_component(ComponentDescriptor::new(
            ComponentId::of::<T>(),
            dependencies,
            factory,
        ));
        self
    }

    /// Declare a controller under `prefix` and open a scope for declaring
    /// its routes. The controller's dependency list comes from its
    /// [`Injectable`] implementation (overwrite semantics, like any other
    /// component registration).
    pub fn controller<C: Injectable>(&mut self, prefix: impl Into<String>) -> ControllerScope<'_, C> {
        let id = ComponentId::of::<C>();
        self.store.register_component(descriptor_of::<C>());
        self.controllers.push((id, prefix.into()));
        ControllerScope {
            assembly: self,
            _controller: PhantomData,
        }
    }

    /// Resolve every controller and bind its routes, producing one dispatch
    /// table per controller in declaration order. Fail-fast: the first boot
    /// error aborts assembly.
    pub fn assemble(&self) -> Result<Vec<DispatchTable>> {
        if let Some((controller, handler)) = self.invalid_routes.first() {
            return Err(TrellisError::InvalidRouteVerb {
                controller: controller.to_string(),
                handler: handler.to_string(),
            });
        }
        let binder = RouteBinder::new(&self.store, &self.resolver);
        self.controllers
            .iter()
            .map(|(id, prefix)| binder.bind(*id, prefix))
            .collect()
    }

    /// Direct access to the resolver, e.g. to eagerly resolve a component
    /// that is not a controller.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolver.resolve_as::<T>(&self.store)
    }
}

fn descriptor_of<T: Injectable>() -> ComponentDescriptor {
    let factory: FactoryFn =
        Arc::new(|deps| Ok(Arc::new(T::construct(deps)?) as Arc<dyn Any + Send + Sync>));
    ComponentDescriptor::new(ComponentId::of::<T>(), T::dependencies(), factory)
}

/// Route-declaration scope for one controller.
pub struct ControllerScope<'a, C> {
    assembly: &'a mut Assembly,
    _controller: PhantomData<C>,
}

impl<C: Injectable> ControllerScope<'_, C> {
    /// Declare a responder route. `method` receives the controller
    /// singleton and the request, and returns a [`HandlerResult`].
    ///
    /// [`Verb::Middleware`] is not a responder verb; declaring it here is
    /// recorded and reported as [`TrellisError::InvalidRouteVerb`] by
    /// [`assemble`](Assembly::assemble).
    pub fn route<F, Fut>(
        self,
        verb: Verb,
        path: impl Into<RoutePath>,
        handler_name: &'static str,
        method: F,
    ) -> Self
    where
        F: Fn(Arc<C>, Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<HandlerResult, HandlerError>> + Send + 'static,
    {
        if verb.is_middleware() {
            self.assembly
                .invalid_routes
                .push((std::any::type_name::<C>(), handler_name));
            return self;
        }
        let method = Arc::new(method);
        let binder: BinderFn = Arc::new(move |instance: Arc<dyn Any + Send + Sync>| {
            let controller = downcast_controller::<C>(instance)?;
            let method = method.clone();
            let handler: BoundHandler = Arc::new(move |request| {
                let controller = controller.clone();
                let method = method.clone();
                Box::pin(async move { (*method)(controller, request).await })
            });
            Ok(BoundCallable::Responder(handler))
        });
        self.register(verb, path.into(), handler_name, binder)
    }

    /// Declare a middleware route. `method` receives the controller
    /// singleton, the request and the continuation; its return value is
    /// never projected into a response.
    pub fn middleware<F, Fut>(
        self,
        path: impl Into<RoutePath>,
        handler_name: &'static str,
        method: F,
    ) -> Self
    where
        F: Fn(Arc<C>, Request<Body>, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Response, HandlerError>> + Send + 'static,
    {
        let method = Arc::new(method);
        let binder: BinderFn = Arc::new(move |instance: Arc<dyn Any + Send + Sync>| {
            let controller = downcast_controller::<C>(instance)?;
            let method = method.clone();
            let middleware: BoundMiddleware = Arc::new(move |request, next| {
                let controller = controller.clone();
                let method = method.clone();
                Box::pin(async move { (*method)(controller, request, next).await })
            });
            Ok(BoundCallable::Middleware(middleware))
        });
        self.register(Verb::Middleware, path.into(), handler_name, binder)
    }

    fn register(self, verb: Verb, path: RoutePath, handler_name: &'static str, binder: BinderFn) -> Self {
        let id = ComponentId::of::<C>();
        self.assembly
            .store
            .register_route(id, RouteDescriptor::new(verb, path, handler_name, binder));
        self
    }
}

fn downcast_controller<C: Send + Sync + 'static>(
    instance: Arc<dyn Any + Send + Sync>,
) -> Result<Arc<C>> {
    instance
        .downcast::<C>()
        .map_err(|_| TrellisError::DowncastFailed {
            type_name: std::any::type_name::<C>().to_string(),
        })
}
