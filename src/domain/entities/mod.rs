pub mod catalog_item;
pub mod chat_message;
pub mod content_chunk;

pub use catalog_item::CatalogItem;
pub use chat_message::{ChatMessage, Role, ToolCall};
pub use content_chunk::ContentChunk;
