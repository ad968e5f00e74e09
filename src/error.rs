use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BurnwiseError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Recurring transaction {0} not found")]
    NotFound(i64),

    #[error("Currency conversion failed: {0}")]
    Conversion(String),

    #[error("Failed to persist transaction: {0}")]
    Persistence(String),

    #[error("Recurring transaction {id} exceeded {limit} schedule steps")]
    IterationLimit { id: i64, limit: usize },

    #[error("Date out of range after {0}")]
    DateOverflow(NaiveDate),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BurnwiseError>;
