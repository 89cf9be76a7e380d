use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("registry document missing field: {0}")]
    MissingField(&'static str),

    #[error("registry document field {field} has unexpected type")]
    InvalidField { field: &'static str },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
