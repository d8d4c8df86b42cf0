//! Normalized profile schema shared by every extraction strategy.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub full_name: String,
    pub biography: String,
    pub external_url: String,
    pub is_private: bool,
    pub is_verified: bool,
    pub profile_pic_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub identity: Identity,
    pub statistics: Statistics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostType {
    Image,
    Video,
    Carousel,
    #[default]
    Unknown,
}

impl PostType {
    /// Maps the site's `__typename` (`GraphImage`, `XDTGraphVideo`, ...).
    pub fn from_typename(typename: &str) -> Self {
        if typename.contains("Image") {
            Self::Image
        } else if typename.contains("Video") {
            Self::Video
        } else if typename.contains("Sidecar") {
            Self::Carousel
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub shortcode: String,
    /// At most 200 characters.
    pub caption: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub likes: u64,
    pub comments: u64,
    /// Unix seconds.
    pub timestamp: i64,
    pub url: String,
    pub media_url: String,
    pub is_video: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsSummary {
    pub recent: Vec<Post>,
    /// Number of posts extracted, not the account's lifetime post count.
    pub total: usize,
}

/// What a strategy produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileData {
    pub profile: Profile,
    pub posts: PostsSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    /// Scraped from meta tags and visible text.
    Low,
}

/// A successful scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProfile {
    pub profile: Profile,
    pub posts: PostsSummary,
    pub used_ip: String,
    pub extraction_time_ms: u64,
    pub data_points: usize,
    pub cached: bool,
    pub strategy: String,
    pub confidence: Confidence,
}

/// Recursive count of object keys and array elements.
pub fn count_data_points(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => {
            map.len() + map.values().map(count_data_points).sum::<usize>()
        }
        serde_json::Value::Array(items) => {
            items.len() + items.iter().map(count_data_points).sum::<usize>()
        }
        _ => 0,
    }
}
