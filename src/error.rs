use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not connected")]
    NotConnected,
    #[error("connection error: {0}")]
    Connection(String),
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("delete requires a non-empty where condition")]
    MissingWhereClause,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
