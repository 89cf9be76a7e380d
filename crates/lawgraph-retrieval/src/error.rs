use lawgraph_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("zero-hop search failed: {0}")]
    Search(#[from] StoreError),
}
