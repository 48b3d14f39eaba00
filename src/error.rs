//! Error types for scraping
//!
//! Evaluation errors are split into fatal ones (bad configuration, bad
//! spec shapes) and recoverable ones (selector misses, failed follows).
//! Only recoverable errors are subject to the isolation policy.

use thiserror::Error;

/// Error raised while loading a page
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("No page available for {0}")]
    NotFound(String),

    #[error("Login is not supported by this fetcher")]
    LoginUnsupported,
}

impl FetchError {
    /// Status code of the failed response, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Request { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Error raised while establishing a session
#[derive(Error, Debug)]
pub enum AuthError {
    #[error(
        "Please specify a `sessionId`. This makes it unnecessary to repeat the auth data \
         when continueing with the same session."
    )]
    MissingSessionId,

    #[error("Please specify the `auth.url`.")]
    MissingUrl,

    #[error("Login failed: {0}")]
    Login(#[source] FetchError),
}

/// Error raised by a scrape
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("{0}")]
    Configuration(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Couldn't find '{selector}'")]
    SelectorNotFound {
        selector: String,
        context: Option<String>,
    },

    #[error("No link to follow in '{selector}'")]
    MissingLink { selector: String },

    #[error("Not following {url}: follow depth limit of {limit} reached")]
    FollowDepth { url: String, limit: usize },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ScrapeError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ScrapeError::Configuration(message.into())
    }

    /// Whether the isolation policy may convert this error into a value.
    ///
    /// Configuration problems (and anything raised before evaluation
    /// starts) always abort the call.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScrapeError::SelectorNotFound { .. }
                | ScrapeError::MissingLink { .. }
                | ScrapeError::FollowDepth { .. }
                | ScrapeError::Fetch(_)
        )
    }
}
