//! Envelope of the `web_profile_info` JSON endpoint.

use serde::{Deserialize, Serialize};

use super::RawUser;

/// `{"data": {"user": {...}}, "status": "ok"}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebProfileInfo {
    #[serde(default)]
    pub data: Option<WebProfileData>,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebProfileData {
    #[serde(default)]
    pub user: Option<RawUser>,
}

impl WebProfileInfo {
    /// Consumes the envelope and returns the user object, if the site sent one.
    pub fn into_user(self) -> Option<RawUser> {
        self.data.and_then(|data| data.user)
    }
}
