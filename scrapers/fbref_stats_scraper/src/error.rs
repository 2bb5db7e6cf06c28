use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Failed to fetch {source_ref}: {reason}")]
    Fetch { source_ref: String, reason: String },
    #[error("Table with id '{id}' not found")]
    TableNotFound { id: String },
    #[error("Table parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ScrapeError {
    pub fn fetch(source_ref: impl Into<String>, reason: impl ToString) -> Self {
        ScrapeError::Fetch {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        ScrapeError::TableNotFound { id: id.into() }
    }
}
