use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Omnidesk is unreachable: {0}")]
    NetworkUnavailable(String),

    // Kept apart from transport failures so API drift is visible to operators.
    #[error("Unexpected Omnidesk API response: {0}")]
    MalformedResponse(String),

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::NetworkUnavailable(err.to_string())
    }
}

impl AppError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        AppError::MalformedResponse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
