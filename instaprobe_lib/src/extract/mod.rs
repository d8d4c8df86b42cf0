//! Ordered extraction strategies and the pipeline that runs them.
//!
//! Strategies run in order and the first success wins. Private and missing
//! profiles stop the run immediately; any other failure moves on to the next
//! strategy. When every strategy fails the result is `SCRAPING_FAILED`
//! carrying the last failure as its cause.

mod api;
mod counts;
mod embedded;
mod heuristic;
mod json_scan;
mod normalize;

use async_trait::async_trait;
use instaprobe_api::types::RawResponse;
use instaprobe_api::RequestKind;

use crate::error::{ErrorKind, ScrapeError};
use crate::fetch::{FetchOrchestrator, Origin};
use crate::profile::{Confidence, ProfileData};

pub use api::WebProfileApiStrategy;
pub use counts::parse_count_string;
pub use embedded::EmbeddedJsonStrategy;
pub use heuristic::HtmlHeuristicStrategy;
pub use json_scan::{extract_json_object, locate_user, scan_embedded_json, EmbeddedScan};
pub use normalize::normalize_user;

/// A successful strategy run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub data: ProfileData,
    pub used_ip: String,
    pub strategy: &'static str,
    pub confidence: Confidence,
}

/// One self-contained way of getting a profile. Implementations never retry.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        username: &str,
        origin: &Origin,
        fetcher: &FetchOrchestrator,
    ) -> Result<Extraction, ScrapeError>;
}

pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::default_strategies()
    }
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Embedded page JSON, then the web profile API, then meta-tag heuristics.
    pub fn default_strategies() -> Self {
        Self::new(vec![
            Box::new(EmbeddedJsonStrategy),
            Box::new(WebProfileApiStrategy),
            Box::new(HtmlHeuristicStrategy),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn run(
        &self,
        username: &str,
        origin: &Origin,
        fetcher: &FetchOrchestrator,
    ) -> Result<Extraction, ScrapeError> {
        let mut last: Option<(&'static str, ScrapeError)> = None;
        for strategy in &self.strategies {
            match strategy.attempt(username, origin, fetcher).await {
                Ok(extraction) => {
                    tracing::info!(
                        "Extracted {} with {} via {}",
                        username,
                        strategy.name(),
                        extraction.used_ip
                    );
                    return Ok(extraction);
                }
                Err(e) if e.kind.is_terminal() => {
                    tracing::info!("{} stopped on {}: {}", strategy.name(), username, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!("{} failed for {}: {}", strategy.name(), username, e);
                    last = Some((strategy.name(), e));
                }
            }
        }

        let failure = match last {
            Some((name, e)) => ScrapeError {
                kind: ErrorKind::ScrapingFailed,
                message: format!("All extraction strategies failed; last was {}: {}", name, e),
                used_ip: e.used_ip,
                cause: Some(e.kind),
            },
            None => ScrapeError::new(
                ErrorKind::ScrapingFailed,
                "No extraction strategies configured",
            ),
        };
        tracing::warn!("Scrape of {} failed: {}", username, failure);
        Err(failure)
    }
}

/// Content verdicts visible in a profile page body.
pub fn classify_body(body: &str) -> Option<ErrorKind> {
    if body.contains("This Account is Private")
        || body.to_lowercase().contains("account is private")
    {
        return Some(ErrorKind::PrivateProfile);
    }
    if body.contains("Sorry, this page isn't available") {
        return Some(ErrorKind::ProfileNotFound);
    }
    None
}

/// Fetches `{base}/{username}/` and applies status and content checks.
/// Returns the 200 response and the address it went out on.
pub(crate) async fn fetch_profile_page(
    username: &str,
    origin: &Origin,
    fetcher: &FetchOrchestrator,
) -> Result<(RawResponse, String), ScrapeError> {
    let url = fetcher.client().profile_url(username)?;
    let outcome = fetcher.fetch(&url, RequestKind::Page, origin, true).await;
    let used_ip = outcome.used_ip();
    let resp = outcome
        .result
        .map_err(|e| ScrapeError::from(e).with_used_ip(used_ip.as_str()))?;

    if !resp.is_ok() {
        return Err(ScrapeError::new(
            ErrorKind::RequestFailed,
            format!("Profile page returned status {}", resp.status),
        )
        .with_used_ip(used_ip));
    }
    if let Some(kind) = classify_body(&resp.body) {
        let message = match kind {
            ErrorKind::PrivateProfile => "Profile is private",
            _ => "Profile not found",
        };
        return Err(ScrapeError::new(kind, message).with_used_ip(used_ip));
    }
    Ok((resp, used_ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_markers() {
        assert_eq!(
            classify_body("<h2>This Account is Private</h2>"),
            Some(ErrorKind::PrivateProfile)
        );
        assert_eq!(
            classify_body("<p>This ACCOUNT IS PRIVATE</p>"),
            Some(ErrorKind::PrivateProfile)
        );
    }

    #[test]
    fn not_found_marker() {
        assert_eq!(
            classify_body("<h2>Sorry, this page isn't available.</h2>"),
            Some(ErrorKind::ProfileNotFound)
        );
        assert_eq!(classify_body("<html>ok</html>"), None);
    }

    #[test]
    fn default_order() {
        assert_eq!(
            ExtractionPipeline::default().strategy_names(),
            vec!["embedded_json", "web_profile_api", "html_heuristic"]
        );
    }
}
