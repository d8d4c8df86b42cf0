mod response;
pub use self::response::RawResponse;

mod user;
pub use self::user::{
    CaptionEdge, CaptionEdges, CaptionNode, EdgeCount, MediaEdge, MediaNode, RawUser,
    TimelineMedia,
};

mod web_profile;
pub use self::web_profile::{WebProfileData, WebProfileInfo};
