use async_trait::async_trait;
use instaprobe_api::types::WebProfileInfo;
use instaprobe_api::RequestKind;

use super::normalize::normalize_user;
use super::{Extraction, Strategy};
use crate::error::{ErrorKind, ScrapeError};
use crate::fetch::{FetchOrchestrator, Origin};
use crate::profile::Confidence;

/// Calls the JSON endpoint the web client uses for profile headers.
pub struct WebProfileApiStrategy;

#[async_trait]
impl Strategy for WebProfileApiStrategy {
    fn name(&self) -> &'static str {
        "web_profile_api"
    }

    async fn attempt(
        &self,
        username: &str,
        origin: &Origin,
        fetcher: &FetchOrchestrator,
    ) -> Result<Extraction, ScrapeError> {
        let url = fetcher.client().web_profile_info_url(username)?;
        let outcome = fetcher.fetch(&url, RequestKind::Api, origin, true).await;
        let used_ip = outcome.used_ip();
        let resp = outcome
            .result
            .map_err(|e| ScrapeError::from(e).with_used_ip(used_ip.as_str()))?;

        if !resp.is_ok() {
            return Err(ScrapeError::new(
                ErrorKind::ApiFailed,
                format!("Profile API returned status {}", resp.status),
            )
            .with_used_ip(used_ip));
        }

        let info: WebProfileInfo = resp.json().map_err(|e| {
            ScrapeError::new(ErrorKind::ParsingError, format!("Bad API response: {}", e))
                .with_used_ip(used_ip.as_str())
        })?;
        let Some(user) = info.into_user() else {
            return Err(
                ScrapeError::new(ErrorKind::UserNotFound, "API response has no user")
                    .with_used_ip(used_ip),
            );
        };

        Ok(Extraction {
            data: normalize_user(&user),
            used_ip,
            strategy: self.name(),
            confidence: Confidence::High,
        })
    }
}
