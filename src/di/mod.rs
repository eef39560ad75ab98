mod injectable;
mod resolver;

pub use injectable::Injectable;
pub use resolver::{DependencyResolver, Resolved};
