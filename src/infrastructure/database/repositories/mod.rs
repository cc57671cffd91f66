pub mod postgres_catalog_repository;
pub mod postgres_chunk_repository;

pub use postgres_catalog_repository::PostgresCatalogRepository;
pub use postgres_chunk_repository::PostgresChunkRepository;
