use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Failures reported by a page collaborator.
///
/// These are transient by nature: the extractor downgrades them to
/// sentinel values instead of failing the record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("Node is no longer attached to the page")]
    Stale,

    #[error("Operation not supported by this page: {0}")]
    Unsupported(&'static str),

    #[error("Interaction failed: {0}")]
    Interaction(String),
}

impl From<ureq::Error> for ScrapeError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(status) => ScrapeError::Http {
                status,
                url: String::new(),
            },
            other => ScrapeError::Network(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for ScrapeError {
    fn from(err: toml::de::Error) -> Self {
        ScrapeError::Config(err.to_string())
    }
}
