pub mod agent_routes;
pub mod embedding_routes;
pub mod health_routes;
pub mod retrieval_routes;

pub use agent_routes::*;
pub use embedding_routes::*;
pub use health_routes::*;
pub use retrieval_routes::*;
