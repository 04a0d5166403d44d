pub mod mutation;
pub mod query;

pub use mutation::TaskGateway;
pub use query::{PageRequest, TaskFilter, TaskQueryEngine, TaskQueryParams};
