//! Raw site objects to the normalized profile schema.

use instaprobe_api::types::{MediaNode, RawUser};

use crate::profile::{
    Identity, Post, PostType, PostsSummary, Profile, ProfileData, Statistics,
};

const MAX_POSTS: usize = 10;
const RECENT_POSTS: usize = 5;
const CAPTION_CHARS: usize = 200;

pub fn normalize_user(user: &RawUser) -> ProfileData {
    let posts: Vec<Post> = user
        .edge_owner_to_timeline_media
        .edges
        .iter()
        .filter_map(|edge| edge.node.as_ref())
        .take(MAX_POSTS)
        .map(normalize_post)
        .collect();
    let total = posts.len();

    ProfileData {
        profile: Profile {
            identity: Identity {
                username: user.username.clone(),
                full_name: user.full_name.clone(),
                biography: user.biography.clone(),
                external_url: user.external_url.clone(),
                is_private: user.is_private,
                is_verified: user.is_verified,
                profile_pic_url: user.avatar_url().to_string(),
            },
            statistics: Statistics {
                followers: user.edge_followed_by.count,
                following: user.edge_follow.count,
                posts: user.edge_owner_to_timeline_media.count,
            },
        },
        posts: PostsSummary {
            recent: posts.into_iter().take(RECENT_POSTS).collect(),
            total,
        },
    }
}

fn normalize_post(node: &MediaNode) -> Post {
    Post {
        id: node.id.clone(),
        shortcode: node.shortcode.clone(),
        caption: node
            .caption_text()
            .map(|text| text.chars().take(CAPTION_CHARS).collect())
            .unwrap_or_default(),
        post_type: PostType::from_typename(&node.typename),
        likes: node.edge_liked_by.count,
        comments: node.edge_media_to_comment.count,
        timestamp: node.taken_at_timestamp,
        url: format!("https://instagram.com/p/{}", node.shortcode),
        media_url: node.display_url.clone(),
        is_video: node.is_video,
    }
}
