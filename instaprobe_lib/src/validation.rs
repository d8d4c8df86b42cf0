use std::net::IpAddr;

use crate::error::{ErrorKind, ScrapeError};

pub const MAX_USERNAME_LENGTH: usize = 30;

/// Validate a username: strips surrounding whitespace and one leading `@`,
/// then requires 1-30 ASCII letters, digits, `.` or `_`.
pub fn validate_username(input: &str) -> Result<String, ScrapeError> {
    let trimmed = input.trim();
    let name = trimmed.strip_prefix('@').unwrap_or(trimmed);

    if name.is_empty() {
        return Err(ScrapeError::new(
            ErrorKind::InvalidUsername,
            "username cannot be empty",
        ));
    }
    if name.len() > MAX_USERNAME_LENGTH {
        return Err(ScrapeError::new(
            ErrorKind::InvalidUsername,
            format!(
                "username too long ({} chars, max {})",
                name.len(),
                MAX_USERNAME_LENGTH
            ),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '_'))
    {
        return Err(ScrapeError::new(
            ErrorKind::InvalidUsername,
            format!("username contains invalid character '{}'", bad),
        ));
    }
    Ok(name.to_string())
}

/// Canonical form of a client IP. Accepts a forwarded list (first hop wins)
/// and bracketed IPv6. Anything unparseable is dropped with a warning.
pub fn normalize_client_ip(input: Option<&str>) -> Option<String> {
    let raw = input?.split(',').next()?.trim();
    if raw.is_empty() {
        return None;
    }
    let unbracketed = raw
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(raw);
    match unbracketed.parse::<IpAddr>() {
        Ok(ip) => Some(ip.to_string()),
        Err(_) => {
            tracing::warn!("Ignoring unparseable client IP '{}'", raw);
            None
        }
    }
}
