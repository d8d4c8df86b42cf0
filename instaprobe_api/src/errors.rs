//! Error types for the site client.

/// Transport-level failures. A response with a non-200 status is not an
/// error at this layer; callers inspect [`crate::types::RawResponse::status`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// The connection to the site or the proxy could not be established.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Any other failure while sending the request or reading the body.
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// A URL could not be built from the base URL and the target.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The proxy address was rejected by the HTTP client.
    #[error("Invalid proxy {0}")]
    InvalidProxy(String),
}

impl Error {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}
