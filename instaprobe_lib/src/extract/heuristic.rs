use std::collections::HashMap;

use ::scraper::{Html, Selector};
use async_trait::async_trait;
use regex::Regex;

use super::counts::parse_count_string;
use super::{fetch_profile_page, Extraction, Strategy};
use crate::error::{ErrorKind, ScrapeError};
use crate::fetch::{FetchOrchestrator, Origin};
use crate::profile::{Confidence, Identity, PostsSummary, Profile, ProfileData, Statistics};

/// Last resort: Open Graph meta tags plus visible `N Followers`-style counts.
pub struct HtmlHeuristicStrategy;

#[async_trait]
impl Strategy for HtmlHeuristicStrategy {
    fn name(&self) -> &'static str {
        "html_heuristic"
    }

    async fn attempt(
        &self,
        username: &str,
        origin: &Origin,
        fetcher: &FetchOrchestrator,
    ) -> Result<Extraction, ScrapeError> {
        let (resp, used_ip) = fetch_profile_page(username, origin, fetcher).await?;
        let data = parse_profile_html(&resp.body, username)
            .map_err(|e| e.with_used_ip(used_ip.as_str()))?;
        Ok(Extraction {
            data,
            used_ip,
            strategy: self.name(),
            confidence: Confidence::Low,
        })
    }
}

/// Builds a profile from meta tags and count text. Fails with
/// `USER_DATA_NOT_FOUND` when the page has neither a title nor any count.
pub fn parse_profile_html(html: &str, username: &str) -> Result<ProfileData, ScrapeError> {
    let meta = meta_tags(html)?;
    let title = meta
        .get("og:title")
        .map(|t| t.replace("• Instagram", "").trim().to_string())
        .unwrap_or_default();

    let followers = extract_count(html, "Followers")?;
    let following = extract_count(html, "Following")?;
    let posts = extract_count(html, "Posts")?;

    if title.is_empty() && followers.is_none() && following.is_none() && posts.is_none() {
        return Err(ScrapeError::new(
            ErrorKind::UserDataNotFound,
            "No profile metadata in page",
        ));
    }

    let lowered = html.to_lowercase();
    Ok(ProfileData {
        profile: Profile {
            identity: Identity {
                username: username.to_string(),
                full_name: title,
                biography: meta.get("og:description").cloned().unwrap_or_default(),
                external_url: String::new(),
                is_private: lowered.contains("private"),
                is_verified: lowered.contains("verified"),
                profile_pic_url: meta.get("og:image").cloned().unwrap_or_default(),
            },
            statistics: Statistics {
                followers: followers.unwrap_or(0),
                following: following.unwrap_or(0),
                posts: posts.unwrap_or(0),
            },
        },
        posts: PostsSummary::default(),
    })
}

/// `property` (or `name`) to `content` for every `<meta>`; first occurrence wins.
fn meta_tags(html: &str) -> Result<HashMap<String, String>, ScrapeError> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("meta").map_err(|e| {
        ScrapeError::new(ErrorKind::ParsingError, format!("selector error: {}", e))
    })?;

    let mut tags = HashMap::new();
    for element in doc.select(&selector) {
        let attrs = element.value();
        let key = attrs.attr("property").or_else(|| attrs.attr("name"));
        if let (Some(key), Some(content)) = (key, attrs.attr("content")) {
            tags.entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
    }
    Ok(tags)
}

fn extract_count(html: &str, label: &str) -> Result<Option<u64>, ScrapeError> {
    let re = Regex::new(&format!(r"(?i)(\d[\d,]*(?:\.\d+)?[KMB]?)\s*{}", label)).map_err(|e| {
        ScrapeError::new(ErrorKind::ParsingError, format!("regex compile error: {}", e))
    })?;
    Ok(re
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| parse_count_string(m.as_str())))
}
