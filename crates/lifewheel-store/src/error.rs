use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store is not set up: {0}")]
    NotSetUp(String),

    #[error("feedback {0} already exists")]
    DuplicateFeedback(String),

    #[error("malformed stored value in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
