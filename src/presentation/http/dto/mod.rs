pub mod agent_dto;
pub mod regeneration_dto;
pub mod response_dto;
pub mod retrieval_dto;

pub use agent_dto::*;
pub use regeneration_dto::*;
pub use response_dto::*;
pub use retrieval_dto::*;
