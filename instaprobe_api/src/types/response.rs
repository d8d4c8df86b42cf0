//! Raw HTTP outcome handed back to the extraction layer.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Status, final URL and decoded body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

impl RawResponse {
    /// Only a plain 200 counts as success for scoring and caching.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}
