pub mod catalog_search_tool;
pub mod complete_order_tool;
pub mod registry;
pub mod tool;

pub use catalog_search_tool::CatalogSearchTool;
pub use complete_order_tool::CompleteOrderTool;
pub use registry::{ToolCommand, ToolOutcome, ToolRegistry};
pub use tool::{ParsedInput, Tool, ToolInputError};
