use std::sync::Arc;

use chrono::Utc;
use dotenv::dotenv;
use tracing::{info, warn};
use uuid::Uuid;

use soundstage::{
    backend::{Backend, MockBackend, Query},
    config::settings::Settings,
    discover::{discover, DiscoverQuery},
    feed::FeedController,
    format::{compact_count, currency, relative_time},
    stories::{
        driver::ReelDriver,
        navigation,
        overlay::UploadModal,
        player::{PlaybackState, StoryViewer},
        scroll::ScrollAffordance,
        view, Reel, Story,
    },
    telemetry::{ActionLogger, BackendActionLogger},
};

const RAIL_VIEWPORT_PX: f32 = 390.0;
const RAIL_SLOT_PX: f32 = 84.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Settings::new();
    let backend = MockBackend::seeded();
    info!("backend seeded, viewing as {}", settings.identity.username);

    let viewer_id = lookup_viewer_id(&backend, &settings.identity.username).await;
    let logger: Arc<dyn ActionLogger> = Arc::new(BackendActionLogger::new(
        backend.clone(),
        settings.identity.username.clone(),
    ));

    let mut feed = FeedController::new(
        backend.clone(),
        logger.clone(),
        viewer_id,
        settings.feed_page_size,
    );
    feed.watch();
    feed.load().await;
    let now = Utc::now();
    for post in feed.posts() {
        let author = post
            .author
            .as_ref()
            .map_or("unknown", |author| author.username.as_str());
        info!(
            "feed: @{} {} | {} likes, {} comments ({})",
            author,
            post.content,
            compact_count(post.likes),
            compact_count(post.comments),
            relative_time(post.created_at, now)
        );
    }

    let creators = discover(
        &backend,
        &DiscoverQuery {
            limit: Some(3),
            ..DiscoverQuery::default()
        },
    )
    .await;
    for creator in &creators {
        info!(
            "discover: {} ({}) {} followers, {} this month",
            creator.name,
            creator.role,
            compact_count(creator.followers),
            currency(creator.monthly_earnings_cents)
        );
    }

    let stories = load_stories(&backend).await;
    let reel = Reel::new(stories);
    let Some(first) = navigation::first_playable(reel.items())
        .and_then(|index| reel.story_at(index))
        .map(|story| story.id)
    else {
        warn!("no stories to play");
        return Ok(());
    };

    let mut rail = ScrollAffordance::new(settings.scroll_step_px);
    rail.on_resize(RAIL_VIEWPORT_PX, reel.len() as f32 * RAIL_SLOT_PX);

    let viewer = StoryViewer::new(reel, settings.identity.clone(), settings.playback_timing());
    info!(
        "initial regions: {:?}",
        view::regions(&viewer, &UploadModal::new(), &rail)
    );

    let (handle, task) = ReelDriver::spawn(viewer, logger.clone());
    handle.open(first).await?;

    // Stand in for the media element: every story reports loaded once shown.
    let mut rx = handle.watch();
    let mut announced = None;
    loop {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.state == PlaybackState::Closed {
            break;
        }
        if snapshot.state == PlaybackState::Loading && snapshot.story_id != announced {
            if let (Some(story_id), Some(index)) = (snapshot.story_id, snapshot.index) {
                info!("reel: showing slot {} (story {})", index, story_id);
                handle.media_loaded(story_id)?;
                announced = Some(story_id);
            }
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    drop(handle);
    task.await?;

    feed.refresh_if_stale().await;
    feed.unwatch();
    info!("reel finished");
    Ok(())
}

async fn lookup_viewer_id(backend: &MockBackend, username: &str) -> Uuid {
    let found = backend
        .query("users", Query::new().eq("username", username).limit(1))
        .await
        .ok()
        .and_then(|rows| rows.into_iter().next())
        .and_then(|row| row.get("id").and_then(|id| id.as_str()).map(str::to_string))
        .and_then(|id| Uuid::parse_str(&id).ok());

    found.unwrap_or_else(|| {
        info!("viewer {} has no profile, using a guest id", username);
        Uuid::new_v4()
    })
}

async fn load_stories(backend: &MockBackend) -> Vec<Story> {
    let query = Query::new().order_by("timestamp_millis", true);
    match backend.query("stories", query).await {
        Ok(records) => records
            .into_iter()
            .filter_map(|record| serde_json::from_value(record).ok())
            .collect(),
        Err(e) => {
            warn!("stories: failed to load: {}", e);
            Vec::new()
        }
    }
}
