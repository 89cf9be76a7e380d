pub mod abbrev;
pub mod appendix;
pub mod article;
pub mod catalog;
pub mod citation;
pub mod error;
pub mod model;
pub mod registry;
pub mod schema;

pub use abbrev::{AbbrevScope, AbbreviationMap};
pub use appendix::{AppendixDocument, AppendixIndex, AppendixTerm};
pub use article::{ArticleNo, chunk_key, pad_law_id};
pub use catalog::{LawCatalog, LawEntry};
pub use citation::{extract_references, parse_citations};
pub use error::CoreError;
pub use model::{ArticleChunk, ChunkMeta, LawCategory, Passage, RefKind, RefTarget, Reference};
