pub mod memory;
pub mod postgres;

pub use memory::InMemoryChunkStore;
pub use postgres::PostgresChunkStore;
