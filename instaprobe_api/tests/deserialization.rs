use instaprobe_api::types::{RawUser, WebProfileInfo};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[test]
fn deserialize_web_profile_info() {
    let json = load_fixture("web_profile_info.json");
    let info: WebProfileInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(info.status.as_deref(), Some("ok"));

    let user = info.into_user().unwrap();
    assert_eq!(user.username, "instagram");
    assert_eq!(user.full_name, "Instagram");
    assert_eq!(user.external_url, "");
    assert!(user.is_verified);
    assert!(!user.is_private);
    assert_eq!(user.avatar_url(), "https://cdn.example.com/pic_hd.jpg");
    assert_eq!(user.edge_followed_by.count, 672000000);
    assert_eq!(user.edge_follow.count, 76);
    assert_eq!(user.edge_owner_to_timeline_media.count, 7800);
    assert_eq!(user.edge_owner_to_timeline_media.edges.len(), 2);
}

#[test]
fn deserialize_media_nodes() {
    let json = load_fixture("web_profile_info.json");
    let user = serde_json::from_str::<WebProfileInfo>(&json)
        .unwrap()
        .into_user()
        .unwrap();

    let video = user.edge_owner_to_timeline_media.edges[0]
        .node
        .as_ref()
        .unwrap();
    assert_eq!(video.typename, "GraphVideo");
    assert_eq!(video.shortcode, "C1abcDEF");
    assert_eq!(video.caption_text(), Some("Behind the scenes"));
    assert_eq!(video.edge_liked_by.count, 120000);
    assert_eq!(video.edge_media_to_comment.count, 3400);
    assert!(video.is_video);

    let sidecar = user.edge_owner_to_timeline_media.edges[1]
        .node
        .as_ref()
        .unwrap();
    assert_eq!(sidecar.caption_text(), None);
    assert_eq!(sidecar.edge_media_to_comment.count, 0);
}

#[test]
fn deserialize_null_user() {
    let json = load_fixture("web_profile_info_no_user.json");
    let info: WebProfileInfo = serde_json::from_str(&json).unwrap();
    assert!(info.into_user().is_none());
}

#[test]
fn deserialize_sparse_user() {
    let user: RawUser = serde_json::from_str(r#"{"username": "someone"}"#).unwrap();
    assert_eq!(user.username, "someone");
    assert_eq!(user.edge_followed_by.count, 0);
    assert_eq!(user.avatar_url(), "");
    assert!(user.edge_owner_to_timeline_media.edges.is_empty());
}

#[test]
fn user_without_username_is_rejected() {
    let result = serde_json::from_str::<RawUser>(r#"{"full_name": "Nobody"}"#);
    assert!(result.is_err());
}
