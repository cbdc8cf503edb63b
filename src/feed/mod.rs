use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{media::MediaKind, stories::Role};

pub mod handler;

pub use handler::FeedController;

/// A feed post as returned by the backend, author embedded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default, rename = "user", skip_serializing_if = "Option::is_none")]
    pub author: Option<PostAuthor>,
    pub content: String,
    #[serde(default)]
    pub media_kind: Option<MediaKind>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PostAuthor {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub role: Role,
    pub verified: bool,
}

/// Request payload for creating a post
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate, PartialEq)]
pub struct PostDraft {
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Post must be between 1 and 2000 characters"
    ))]
    pub content: String,
    pub media_kind: Option<MediaKind>,
}

/// Role filter menu above the feed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeedFilter {
    #[default]
    All,
    Artists,
    Producers,
    Fans,
}

impl FeedFilter {
    pub fn matches(self, post: &Post) -> bool {
        let role = post.author.as_ref().map(|author| author.role);
        match self {
            FeedFilter::All => true,
            FeedFilter::Artists => role == Some(Role::Artist),
            FeedFilter::Producers => role == Some(Role::Producer),
            FeedFilter::Fans => role == Some(Role::Fan),
        }
    }
}
