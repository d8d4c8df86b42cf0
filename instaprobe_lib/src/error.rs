//! Request-facing error taxonomy.

use std::fmt;

use serde::Serialize;

/// Why a scrape (or one strategy of it) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Non-200 page or an unclassified transport failure.
    RequestFailed,
    Timeout,
    ConnectionError,
    PrivateProfile,
    ProfileNotFound,
    /// Page fetched but no user object could be located in it.
    UserDataNotFound,
    /// API answered but carried no user.
    UserNotFound,
    ParsingError,
    ApiFailed,
    /// Every strategy failed.
    ScrapingFailed,
    AuthenticationRequired,
    InvalidUsername,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestFailed => "REQUEST_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::PrivateProfile => "PRIVATE_PROFILE",
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::UserDataNotFound => "USER_DATA_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::ParsingError => "PARSING_ERROR",
            Self::ApiFailed => "API_FAILED",
            Self::ScrapingFailed => "SCRAPING_FAILED",
            Self::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            Self::InvalidUsername => "INVALID_USERNAME",
        }
    }

    /// Content-based verdicts about the target. The pipeline stops on these
    /// instead of trying the next strategy.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PrivateProfile | Self::ProfileNotFound)
    }

    /// Failures that say the outbound path is down rather than the target.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionError)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed failure plus the address the request went out on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct ScrapeError {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    pub message: String,
    /// Client IP, proxy `host:port`, or `"direct"`. `None` when no request was made.
    pub used_ip: Option<String>,
    /// For `SCRAPING_FAILED`, the kind of the last strategy failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<ErrorKind>,
}

impl ScrapeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            used_ip: None,
            cause: None,
        }
    }

    pub fn with_used_ip(mut self, used_ip: impl Into<String>) -> Self {
        self.used_ip = Some(used_ip.into());
        self
    }

    /// The kind that actually stopped the scrape: the cause for `SCRAPING_FAILED`, else `kind`.
    pub fn root_kind(&self) -> ErrorKind {
        self.cause.unwrap_or(self.kind)
    }
}

impl From<instaprobe_api::Error> for ScrapeError {
    fn from(e: instaprobe_api::Error) -> Self {
        let kind = match &e {
            instaprobe_api::Error::Timeout => ErrorKind::Timeout,
            instaprobe_api::Error::Connection(_) => ErrorKind::ConnectionError,
            _ => ErrorKind::RequestFailed,
        };
        Self::new(kind, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::UserDataNotFound).unwrap();
        assert_eq!(json, "\"USER_DATA_NOT_FOUND\"");
        assert_eq!(ErrorKind::PrivateProfile.to_string(), "PRIVATE_PROFILE");
    }

    #[test]
    fn transport_errors_map_to_kinds() {
        let timeout: ScrapeError = instaprobe_api::Error::Timeout.into();
        assert_eq!(timeout.kind, ErrorKind::Timeout);
        let conn: ScrapeError = instaprobe_api::Error::Connection("refused".into()).into();
        assert_eq!(conn.kind, ErrorKind::ConnectionError);
        let other: ScrapeError = instaprobe_api::Error::RequestFailed("boom".into()).into();
        assert_eq!(other.kind, ErrorKind::RequestFailed);
    }

    #[test]
    fn only_content_verdicts_are_terminal() {
        assert!(ErrorKind::PrivateProfile.is_terminal());
        assert!(ErrorKind::ProfileNotFound.is_terminal());
        assert!(!ErrorKind::UserDataNotFound.is_terminal());
        assert!(!ErrorKind::Timeout.is_terminal());
    }

    #[test]
    fn error_envelope_shape() {
        let err = ScrapeError::new(ErrorKind::PrivateProfile, "Profile is private")
            .with_used_ip("1.2.3.4");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["error"], "PRIVATE_PROFILE");
        assert_eq!(value["used_ip"], "1.2.3.4");
        assert!(value.get("cause").is_none());
        assert_eq!(err.to_string(), "PRIVATE_PROFILE: Profile is private");
    }
}
