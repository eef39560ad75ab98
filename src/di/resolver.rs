use crate::error::{Result, TrellisError};
use crate::metadata::{ComponentDescriptor, ComponentId, MetadataStore};
use dashmap::DashMap;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Read-only view over the singleton cache handed to component factories.
///
/// By the time a factory runs, the topological order guarantees every
/// declared dependency has already been constructed and cached.
pub struct Resolved<'a> {
    singletons: &'a DashMap<ComponentId, Arc<dyn Any + Send + Sync>>,
}

impl Resolved<'_> {
    /// Fetch a cached dependency instance.
    ///
    /// # Errors
    /// Fails if `T` was never registered, or its entry holds a different
    /// type than requested.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let id = ComponentId::of::<T>();
        let entry = self
            .singletons
            .get(&id)
            .ok_or_else(|| TrellisError::ComponentNotRegistered {
                type_name: id.name().to_string(),
            })?;
        entry
            .value()
            .clone()
            .downcast::<T>()
            .map_err(|_| TrellisError::DowncastFailed {
                type_name: id.name().to_string(),
            })
    }
}

/// Materializes process-lifetime singletons in dependency order.
///
/// Runs Kahn's topological sort over the entire registered graph, not just
/// the requested root's transitive closure, constructing each component the
/// first time it is popped. Intended for single-threaded bootstrap use;
/// after assembly the cache is read-only.
#[derive(Default)]
pub struct DependencyResolver {
    singletons: DashMap<ComponentId, Arc<dyn Any + Send + Sync>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `root` to its singleton instance, constructing it and any
    /// not-yet-built components along the way.
    ///
    /// The graph and in-degree pass is recomputed on every call; cached
    /// singletons short-circuit reconstruction, so repeated calls return
    /// identical instances. Acceptable for bounded bootstrap resolution,
    /// never for per-request use.
    ///
    /// # Errors
    /// - [`TrellisError::ComponentNotRegistered`] when `root` was never
    ///   registered.
    /// - [`TrellisError::CircularDependency`] when `root` sits on a
    ///   dependency cycle; every component on the cycle fails the same way.
    /// - Factory errors propagate unchanged.
    pub fn resolve(
        &self,
        store: &MetadataStore,
        root: ComponentId,
    ) -> Result<Arc<dyn Any + Send + Sync>> {
        let mut in_degree: HashMap<ComponentId, usize> = HashMap::new();
        let mut dependents: HashMap<ComponentId, Vec<ComponentId>> = HashMap::new();

        // Edges point dependency -> dependent, so a component's in-degree
        // is the number of dependencies it declares.
        for descriptor in store.components() {
            in_degree.entry(descriptor.id()).or_insert(0);
            for dep in descriptor.dependencies() {
                in_degree.entry(*dep).or_insert(0);
                *in_degree.entry(descriptor.id()).or_insert(0) += 1;
                dependents.entry(*dep).or_default().push(descriptor.id());
            }
        }

        let mut queue: VecDeque<ComponentId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        while let Some(current) = queue.pop_front() {
            if !self.singletons.contains_key(&current) {
                // A referenced-but-unregistered dependency has no factory;
                // leave its slot empty and let a dependent's construction
                // surface the missing registration.
                if let Some(descriptor) = store.descriptor(current) {
                    let instance = self.construct(descriptor)?;
                    self.singletons.insert(current, instance);
                }
            }
            for dependent in dependents.get(&current).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        if let Some(instance) = self.singletons.get(&root) {
            return Ok(instance.value().clone());
        }

        if store.descriptor(root).is_none() {
            return Err(TrellisError::ComponentNotRegistered {
                type_name: root.name().to_string(),
            });
        }

        // Registered but never constructed after a full drain: the root is
        // part of a cycle. Name every unresolved member.
        let mut members: Vec<&str> = store
            .components()
            .filter(|d| !self.singletons.contains_key(&d.id()))
            .map(|d| d.id().name())
            .collect();
        members.sort_unstable();
        Err(TrellisError::CircularDependency {
            cycle: members.join(", "),
        })
    }

    /// Typed convenience over [`resolve`](Self::resolve).
    pub fn resolve_as<T: Send + Sync + 'static>(&self, store: &MetadataStore) -> Result<Arc<T>> {
        let id = ComponentId::of::<T>();
        self.resolve(store, id)?
            .downcast::<T>()
            .map_err(|_| TrellisError::DowncastFailed {
                type_name: id.name().to_string(),
            })
    }

    fn construct(&self, descriptor: &ComponentDescriptor) -> Result<Arc<dyn Any + Send + Sync>> {
        let resolved = Resolved {
            singletons: &self.singletons,
        };
        let instance = (descriptor.factory().as_ref())(&resolved)?;
        tracing::debug!(component = descriptor.id().name(), "constructed singleton");
        Ok(instance)
    }
}
