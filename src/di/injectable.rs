use crate::di::Resolved;
use crate::error::Result;
use crate::metadata::ComponentId;

/// Trait for types that participate in dependency injection.
///
/// Declares the type's dependency list and how to construct it once those
/// dependencies have been resolved. Instances are process-lifetime
/// singletons; `construct` runs at most once per process.
///
/// # Example
/// ```
/// use trellis::{ComponentId, Injectable, Resolved, Result};
/// use std::sync::Arc;
///
/// pub struct Database;
///
/// impl Injectable for Database {
///     fn construct(_deps: &Resolved<'_>) -> Result<Self> {
///         Ok(Database)
///     }
/// }
///
/// pub struct TodoRepository {
///     db: Arc<Database>,
/// }
///
/// impl Injectable for TodoRepository {
///     fn dependencies() -> Vec<ComponentId> {
///         vec![ComponentId::of::<Database>()]
///     }
///
///     fn construct(deps: &Resolved<'_>) -> Result<Self> {
///         Ok(TodoRepository {
///             db: deps.get::<Database>()?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Dependencies in construction-argument order.
    fn dependencies() -> Vec<ComponentId> {
        Vec::new()
    }

    /// Create an instance from already-resolved dependencies.
    ///
    /// # Errors
    /// Returns an error if a declared dependency is missing from the
    /// resolved set or construction itself fails.
    fn construct(deps: &Resolved<'_>) -> Result<Self>;
}
