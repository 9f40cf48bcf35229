use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No valid transactions found")]
    NoTransactions,

    #[error("Unknown import: {0}")]
    UnknownImport(i64),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown line format: {0}")]
    UnknownFormat(String),

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
