use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::media::MediaKind;

pub mod driver;
pub mod navigation;
pub mod overlay;
pub mod player;
pub mod scroll;
pub mod view;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Artist,
    Producer,
    Fan,
}

impl Role {
    /// Artists and producers publish; fans only consume.
    pub fn is_creator(self) -> bool {
        matches!(self, Role::Artist | Role::Producer)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Artist => "artist",
            Role::Producer => "producer",
            Role::Fan => "fan",
        };
        f.write_str(label)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "artist" => Ok(Role::Artist),
            "producer" => Ok(Role::Producer),
            "fan" => Ok(Role::Fan),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: Uuid,
    pub user: StoryAuthor,
    pub content: StoryContent,
    pub metrics: StoryMetrics,
    pub timestamp_millis: i64,
    pub has_monetization: bool,
}

impl Story {
    /// Monetization needs both the flag and an actual earnings breakdown.
    pub fn is_monetized(&self) -> bool {
        self.has_monetization && self.metrics.earnings.is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoryAuthor {
    pub name: String,
    pub username: String,
    pub avatar: String,
    pub role: Role,
    pub verified: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StoryContent {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub duration_seconds: u32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct StoryMetrics {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings: Option<Earnings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time: Option<RealTimeMetrics>,
}

/// Earnings breakdown, all amounts in cents.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Earnings {
    pub total_cents: u64,
    pub tips_cents: u64,
    pub streaming_cents: u64,
    pub subscriptions_cents: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RealTimeMetrics {
    pub current_viewers: u64,
    pub engagement_rate: f32,
}

/// One slot of the horizontal story rail.
#[derive(Clone, Debug, PartialEq)]
pub enum ReelItem {
    /// Entry point for uploading a new story. Never played.
    AddStory,
    Story(Story),
}

impl ReelItem {
    pub fn is_playable(&self) -> bool {
        matches!(self, ReelItem::Story(_))
    }

    pub fn story(&self) -> Option<&Story> {
        match self {
            ReelItem::Story(story) => Some(story),
            ReelItem::AddStory => None,
        }
    }
}

/// Ordered reel for one viewing session, add-story slot first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reel {
    items: Vec<ReelItem>,
}

impl Reel {
    pub fn new(stories: impl IntoIterator<Item = Story>) -> Self {
        let items = std::iter::once(ReelItem::AddStory)
            .chain(stories.into_iter().map(ReelItem::Story))
            .collect();
        Self { items }
    }

    pub fn items(&self) -> &[ReelItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&ReelItem> {
        self.items.get(index)
    }

    pub fn story_at(&self, index: usize) -> Option<&Story> {
        self.items.get(index).and_then(ReelItem::story)
    }

    pub fn position(&self, story_id: Uuid) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.story().is_some_and(|story| story.id == story_id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadKind {
    #[default]
    Photo,
    Video,
}

impl From<UploadKind> for MediaKind {
    fn from(kind: UploadKind) -> Self {
        match kind {
            UploadKind::Photo => MediaKind::Photo,
            UploadKind::Video => MediaKind::Video,
        }
    }
}

/// Draft held by the upload modal while it is open.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate, PartialEq)]
pub struct UploadDraft {
    pub media_kind: UploadKind,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be between 1 and 100 characters"
    ))]
    pub title: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reel_prepends_a_single_add_story_slot() {
        let reel = Reel::new([fixtures::story("mira", 15), fixtures::story("oko", 15)]);
        assert_eq!(reel.len(), 3);
        assert_eq!(reel.get(0), Some(&ReelItem::AddStory));
        assert!(reel.items()[1..].iter().all(ReelItem::is_playable));
    }

    #[test]
    fn monetization_needs_earnings_data() {
        let mut story = fixtures::story("mira", 15);
        story.has_monetization = true;
        assert!(!story.is_monetized());
        assert!(fixtures::monetized("mira").is_monetized());
    }

    #[test]
    fn story_record_uses_type_for_content_kind() {
        let story = fixtures::story("mira", 10);
        let value = serde_json::to_value(&story).unwrap();
        assert_eq!(value["content"]["type"], "photo");
        assert_eq!(value["user"]["role"], "artist");

        let back: Story = serde_json::from_value(value).unwrap();
        assert_eq!(back, story);
    }

    #[test]
    fn upload_draft_requires_a_title() {
        let draft = UploadDraft::default();
        assert!(draft.validate().is_err());

        let draft = UploadDraft {
            title: "New beat".to_string(),
            ..UploadDraft::default()
        };
        assert!(draft.validate().is_ok());
    }
}
