//! Storage layer: the chunk index capability, Parquet chunk tables, and
//! persisted abbreviation artifacts.

mod error;
pub use error::StoreError;

pub mod artifacts;
pub mod index;
pub mod table;

pub use index::{ChunkIndex, MemoryIndex};
