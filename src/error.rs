use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaxonError {
    #[error("Category already exists: {0}")]
    DuplicateName(String),

    #[error("Parent category not found: {0}")]
    ParentNotFound(String),

    #[error("Category not found: {0}")]
    NotFound(String),

    #[error("Category tree is empty")]
    EmptyTree,

    #[error("No categories to export")]
    EmptyStore,

    #[error("Invalid row {row}: {reason}")]
    InvalidRowFormat { row: usize, reason: String },

    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("File transfer failed: {0}")]
    TransferFailure(String),

    #[error("Invalid category name: {0:?}")]
    InvalidName(String),

    #[error("Category would become its own ancestor: {0}")]
    CycleDetected(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Unknown command: {0} (try /help)")]
    UnknownCommand(String),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, TaxonError>;
