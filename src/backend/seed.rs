//! Hard-coded data the app ships with until a real backend is wired in.

use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::{
    backend::MockBackend,
    media::MediaKind,
    stories::{Earnings, RealTimeMetrics, Role, Story, StoryAuthor, StoryContent, StoryMetrics},
};

struct Creator {
    id: &'static str,
    name: &'static str,
    username: &'static str,
    role: Role,
    verified: bool,
    followers: u64,
    monthly_earnings_cents: u64,
}

const CREATORS: [Creator; 5] = [
    Creator {
        id: "8f1c6c1e-8d7a-4a53-9c44-0c2b8f0b1a01",
        name: "Mira Vale",
        username: "miravale",
        role: Role::Artist,
        verified: true,
        followers: 184_200,
        monthly_earnings_cents: 1_245_000,
    },
    Creator {
        id: "8f1c6c1e-8d7a-4a53-9c44-0c2b8f0b1a02",
        name: "Oko Beats",
        username: "okobeats",
        role: Role::Producer,
        verified: true,
        followers: 92_750,
        monthly_earnings_cents: 864_500,
    },
    Creator {
        id: "8f1c6c1e-8d7a-4a53-9c44-0c2b8f0b1a03",
        name: "Lena Marsh",
        username: "lenamarsh",
        role: Role::Artist,
        verified: false,
        followers: 12_400,
        monthly_earnings_cents: 98_000,
    },
    Creator {
        id: "8f1c6c1e-8d7a-4a53-9c44-0c2b8f0b1a04",
        name: "Dex Arroyo",
        username: "dexarroyo",
        role: Role::Producer,
        verified: false,
        followers: 7_980,
        monthly_earnings_cents: 41_000,
    },
    Creator {
        id: "8f1c6c1e-8d7a-4a53-9c44-0c2b8f0b1a05",
        name: "Sam Quill",
        username: "samquill",
        role: Role::Fan,
        verified: false,
        followers: 310,
        monthly_earnings_cents: 0,
    },
];

const POSTS: [(&str, usize, &str, MediaKind, u64, u64, u64, i64); 4] = [
    ("b2c3a0d4-1f7e-4c1a-8a0e-5d9e4f6a7b01", 0, "New single drops Friday. Who's ready?", MediaKind::Audio, 2_341, 187, 92, 2),
    ("b2c3a0d4-1f7e-4c1a-8a0e-5d9e4f6a7b02", 1, "Beat tape vol. 3 is live, samples flipped from a 70s jazz record", MediaKind::Audio, 1_120, 64, 38, 5),
    ("b2c3a0d4-1f7e-4c1a-8a0e-5d9e4f6a7b03", 2, "Rehearsal clip from last night", MediaKind::Video, 412, 23, 7, 26),
    ("b2c3a0d4-1f7e-4c1a-8a0e-5d9e4f6a7b04", 4, "That set at the Roxy was unreal", MediaKind::Photo, 58, 4, 1, 49),
];

pub fn populate(backend: &MockBackend) {
    backend.put_table("users", CREATORS.iter().map(user_record).collect());
    backend.put_table("posts", post_records());
    backend.put_table("stories", story_records());
    backend.put_table("user_actions", Vec::new());
}

fn user_record(creator: &Creator) -> Value {
    json!({
        "id": creator.id,
        "name": creator.name,
        "username": creator.username,
        "avatar": avatar_url(creator.username),
        "role": creator.role,
        "verified": creator.verified,
        "followers": creator.followers,
        "monthly_earnings_cents": creator.monthly_earnings_cents,
    })
}

fn post_records() -> Vec<Value> {
    let now = Utc::now();
    POSTS
        .iter()
        .map(|(id, creator, content, kind, likes, comments, shares, hours_ago)| {
            json!({
                "id": id,
                "user_id": CREATORS[*creator].id,
                "content": content,
                "media_kind": kind,
                "likes": likes,
                "comments": comments,
                "shares": shares,
                "created_at": now - Duration::hours(*hours_ago),
            })
        })
        .collect()
}

fn story_records() -> Vec<Value> {
    let mut rng = rand::thread_rng();
    let now = Utc::now();

    let stories = [
        (0, MediaKind::Photo, "Studio day", "Tracking vocals for the new record", 15, true),
        (1, MediaKind::Video, "Sample flip", "From dusty vinyl to a finished loop", 12, true),
        (2, MediaKind::Photo, "Green room", "Twenty minutes to showtime", 8, false),
        (3, MediaKind::Video, "Drum rack tour", "Every kit I used this year", 10, false),
    ];

    stories
        .into_iter()
        .enumerate()
        .filter_map(|(i, (creator, kind, title, description, duration_seconds, monetized))| {
            let creator = &CREATORS[creator];
            let earnings = monetized.then(|| {
                let tips_cents = rng.gen_range(1_000..20_000);
                let streaming_cents = rng.gen_range(5_000..60_000);
                let subscriptions_cents = rng.gen_range(0..15_000);
                Earnings {
                    total_cents: tips_cents + streaming_cents + subscriptions_cents,
                    tips_cents,
                    streaming_cents,
                    subscriptions_cents,
                }
            });
            let story = Story {
                id: Uuid::new_v4(),
                user: StoryAuthor {
                    name: creator.name.to_string(),
                    username: creator.username.to_string(),
                    avatar: avatar_url(creator.username),
                    role: creator.role,
                    verified: creator.verified,
                },
                content: StoryContent {
                    kind,
                    title: title.to_string(),
                    description: description.to_string(),
                    media_url: format!("https://cdn.soundstage.example/stories/{}-{i}", creator.username),
                    duration_seconds,
                },
                metrics: StoryMetrics {
                    likes: rng.gen_range(50..5_000),
                    comments: rng.gen_range(0..300),
                    shares: rng.gen_range(0..120),
                    views: rng.gen_range(1_000..50_000),
                    earnings,
                    real_time: monetized.then(|| RealTimeMetrics {
                        current_viewers: rng.gen_range(5..400),
                        engagement_rate: rng.gen_range(0.02..0.2),
                    }),
                },
                timestamp_millis: (now - Duration::minutes(30 * i as i64)).timestamp_millis(),
                has_monetization: monetized,
            };
            serde_json::to_value(&story)
                .map_err(|e| warn!("seed: skipping story {}: {:?}", title, e))
                .ok()
        })
        .collect()
}

fn avatar_url(username: &str) -> String {
    format!("https://cdn.soundstage.example/avatars/{username}.jpg")
}
