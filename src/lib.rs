//! # Trellis
//!
//! A declaration-driven request-routing and dependency-injection layer in
//! front of axum.
//!
//! Trellis takes plain declarations (which components exist, what they
//! depend on, which controller methods serve which routes) and turns them
//! into process-lifetime singletons and a mountable dispatch table.
//!
//! ## Features
//!
//! - **Dependency injection**: components declare an ordered dependency
//!   list; a topological pass constructs every singleton exactly once, in
//!   the right order, and detects cycles at boot.
//! - **Controller routing**: routes declared per controller with an optional
//!   prefix, bound to the resolved singleton's methods, with duplicate
//!   detection.
//! - **Closed handler results**: handlers return `Structured`, `Redirect`
//!   or `NoResponse`, with no runtime probing of arbitrary return values.
//! - **Middleware routes**: path-scoped continuations, exempt from conflict
//!   checks and never projected into responses.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::{
//!     mount_all, Assembly, ComponentId, Injectable, Resolved, ResponseEntity,
//!     ResponseProjector, Result, Verb,
//! };
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct TodoRepository;
//!
//! impl Injectable for TodoRepository {
//!     fn construct(_: &Resolved<'_>) -> Result<Self> {
//!         Ok(TodoRepository)
//!     }
//! }
//!
//! struct TodoController {
//!     repository: Arc<TodoRepository>,
//! }
//!
//! impl Injectable for TodoController {
//!     fn dependencies() -> Vec<ComponentId> {
//!         vec![ComponentId::of::<TodoRepository>()]
//!     }
//!
//!     fn construct(deps: &Resolved<'_>) -> Result<Self> {
//!         Ok(TodoController {
//!             repository: deps.get::<TodoRepository>()?,
//!         })
//!     }
//! }
//!
//! impl TodoController {
//!     async fn list(&self) -> ResponseEntity {
//!         ResponseEntity::ok().body(json!([]))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut assembly = Assembly::new();
//!     assembly.provide::<TodoRepository>();
//!     assembly
//!         .controller::<TodoController>("/api/todo")
//!         .route(Verb::Get, "", "list", |c, _req| async move {
//!             Ok(c.list().await.into())
//!         });
//!
//!     let tables = assembly.assemble().expect("boot failure");
//!     let app = mount_all(tables, ResponseProjector::new()).expect("boot failure");
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod assembly;
pub mod di;
pub mod error;
pub mod exception;
pub mod metadata;
pub mod mount;
pub mod response;
pub mod router;

// Re-export core types
pub use assembly::{Assembly, ControllerScope};
pub use di::{DependencyResolver, Injectable, Resolved};
pub use error::{Result, TrellisError};
pub use exception::HttpStatusError;
pub use metadata::{ComponentId, MetadataStore, RoutePath, Verb};
pub use mount::{mount, mount_all};
pub use response::{
    HandlerResult, Projection, RedirectView, ResponseEntity, ResponseProjector, SerializeFn,
};
pub use router::{DispatchEntry, DispatchTable, HandlerError, Next, RouteBinder, RouteKind};

// Re-export commonly used types from dependencies
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use trellis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::assembly::{Assembly, ControllerScope};
    pub use crate::di::{DependencyResolver, Injectable, Resolved};
    pub use crate::error::{Result, TrellisError};
    pub use crate::exception::HttpStatusError;
    pub use crate::metadata::{ComponentId, MetadataStore, RoutePath, Verb};
    pub use crate::mount::{mount, mount_all};
    pub use crate::response::{
        HandlerResult, Projection, RedirectView, ResponseEntity, ResponseProjector,
    };
    pub use crate::router::{DispatchTable, HandlerError, Next, RouteBinder, RouteKind};
    pub use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::{IntoResponse, Response},
        Router,
    };
    pub use std::sync::Arc;
}
