use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaccoonError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Malformed oracle output: {0}")]
    MalformedOracleOutput(String),

    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("'{0}' is a built-in category and cannot be removed")]
    ProtectedCategory(String),

    #[error("Invalid category name: {0}")]
    InvalidCategoryName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No pending delete preview")]
    NoPendingPreview,

    #[error("Delete preview expired")]
    PreviewExpired,

    #[error("Ordinal {0} is out of range (1..={1})")]
    OrdinalOutOfRange(usize, usize),

    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for RaccoonError {
    fn from(e: reqwest::Error) -> Self {
        RaccoonError::OracleUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RaccoonError>;
