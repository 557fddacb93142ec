use crate::browser::BrowserError;

/// Errors that end a scraping run
///
/// Every variant is terminal. Field-level gaps during DOM extraction are not
/// errors at all; they surface as `None` on the extracted line.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Response error: {0}")]
    Response(String),

    #[error("Failed to decode JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Extracted {names} names but {identifiers} ISIN links")]
    CardinalityMismatch { names: usize, identifiers: usize },

    #[error("Extracted {names} names but {rows} holding rows")]
    RowMismatch { names: usize, rows: usize },

    #[error("Link has no isin query parameter: {link}")]
    MissingIsin { link: String },

    #[error("Invalid ISIN: {0:?}")]
    InvalidIsin(String),

    #[error(transparent)]
    Browser(BrowserError),

    #[error("Failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

impl From<BrowserError> for ScrapeError {
    fn from(e: BrowserError) -> Self {
        match e {
            BrowserError::Timeout(what) => ScrapeError::Timeout(what),
            BrowserError::ElementNotFound(what) => ScrapeError::ElementNotFound(what),
            other => ScrapeError::Browser(other),
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout(format!("HTTP request: {}", e))
        } else {
            ScrapeError::Response(e.to_string())
        }
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
