use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrellisError>;

/// Boot-time errors raised while assembling the container and the dispatch
/// tables. Every variant is fatal at startup; nothing here is raised per
/// request.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("Component not registered: {type_name}")]
    ComponentNotRegistered { type_name: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Duplicate route {verb} \"{path}\" in controller \"{controller}\"")]
    RegistrationConflict {
        controller: String,
        verb: String,
        path: String,
    },

    #[error("Route \"{handler}\" in controller \"{controller}\" uses the middleware verb; declare it with middleware()")]
    InvalidRouteVerb { controller: String, handler: String },

    #[error("Component construction failed for {type_name}: {message}")]
    ConstructionFailed { type_name: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for TrellisError {
    fn into_response(self) -> axum::response::Response {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            self.to_string(),
        )
            .into_response()
    }
}
