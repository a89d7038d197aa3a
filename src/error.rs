use thiserror::Error;

#[derive(Error, Debug)]
pub enum SitebookError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Could not read workbook: {0}")]
    Workbook(String),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("Unsupported bank statement format: {reason}")]
    UnsupportedFormat { reason: String },

    #[error("Could not find header row in the first {scanned} rows")]
    HeaderNotFound { scanned: usize },

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, SitebookError>;
