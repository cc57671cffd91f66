pub mod catalog_item_model;
pub mod chunk_model;

pub use catalog_item_model::*;
pub use chunk_model::*;
