pub mod catalog_repository;
pub mod chunk_repository;

pub use catalog_repository::CatalogRepository;
pub use chunk_repository::ChunkRepository;
