//! User and media objects as embedded in profile pages and returned by the
//! web profile endpoint.
//!
//! The site's schema changes without notice, so every field defaults and an
//! explicit `null` is treated the same as a missing key.

use serde::{Deserialize, Deserializer, Serialize};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A `{"count": n}` wrapper used for followers, following, likes and comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCount {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

/// Profile owner object (`graphql.user` / `data.user`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    pub username: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub biography: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub external_url: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_private: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_verified: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub profile_pic_url: String,

    /// High resolution avatar, preferred over `profile_pic_url` when present.
    #[serde(default, deserialize_with = "null_as_default")]
    pub profile_pic_url_hd: String,

    /// Followers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_followed_by: EdgeCount,

    /// Following.
    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_follow: EdgeCount,

    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_owner_to_timeline_media: TimelineMedia,
}

impl RawUser {
    /// Best available avatar URL.
    pub fn avatar_url(&self) -> &str {
        if self.profile_pic_url_hd.is_empty() {
            &self.profile_pic_url
        } else {
            &self.profile_pic_url_hd
        }
    }
}

/// Post count plus the first page of timeline media.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineMedia {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<MediaEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaEdge {
    #[serde(default)]
    pub node: Option<MediaNode>,
}

/// A single post in the timeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub shortcode: String,

    /// `GraphImage`, `GraphVideo` or `GraphSidecar`.
    #[serde(rename = "__typename", default, deserialize_with = "null_as_default")]
    pub typename: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_media_to_caption: CaptionEdges,

    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_liked_by: EdgeCount,

    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_media_to_comment: EdgeCount,

    /// Unix seconds.
    #[serde(default, deserialize_with = "null_as_default")]
    pub taken_at_timestamp: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub display_url: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub is_video: bool,
}

impl MediaNode {
    /// Text of the first caption edge, if any.
    pub fn caption_text(&self) -> Option<&str> {
        self.edge_media_to_caption
            .edges
            .first()
            .map(|edge| edge.node.text.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionEdges {
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<CaptionEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionEdge {
    #[serde(default, deserialize_with = "null_as_default")]
    pub node: CaptionNode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
}
