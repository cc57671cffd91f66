pub mod in_memory_catalog_repository;
pub mod in_memory_chunk_repository;

pub use in_memory_catalog_repository::{InMemoryCatalogRepository, load_seed_items};
pub use in_memory_chunk_repository::InMemoryChunkRepository;
