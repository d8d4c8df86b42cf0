use async_trait::async_trait;
use instaprobe_api::types::RawUser;

use super::json_scan::scan_embedded_json;
use super::normalize::normalize_user;
use super::{fetch_profile_page, Extraction, Strategy};
use crate::error::{ErrorKind, ScrapeError};
use crate::fetch::{FetchOrchestrator, Origin};
use crate::profile::Confidence;

/// Reads the state object the profile page inlines in its scripts.
pub struct EmbeddedJsonStrategy;

#[async_trait]
impl Strategy for EmbeddedJsonStrategy {
    fn name(&self) -> &'static str {
        "embedded_json"
    }

    async fn attempt(
        &self,
        username: &str,
        origin: &Origin,
        fetcher: &FetchOrchestrator,
    ) -> Result<Extraction, ScrapeError> {
        let (resp, used_ip) = fetch_profile_page(username, origin, fetcher).await?;

        let scan = scan_embedded_json(&resp.body);
        let Some(user) = scan.find_user() else {
            let (kind, message) = if scan.objects.is_empty() && scan.malformed > 0 {
                (ErrorKind::ParsingError, "Embedded page data is not valid JSON")
            } else {
                (ErrorKind::UserDataNotFound, "No user object in page data")
            };
            return Err(ScrapeError::new(kind, message).with_used_ip(used_ip));
        };

        let user: RawUser = serde_json::from_value(user.clone()).map_err(|e| {
            ScrapeError::new(ErrorKind::ParsingError, format!("Bad user object: {}", e))
                .with_used_ip(used_ip.as_str())
        })?;

        Ok(Extraction {
            data: normalize_user(&user),
            used_ip,
            strategy: self.name(),
            confidence: Confidence::High,
        })
    }
}
