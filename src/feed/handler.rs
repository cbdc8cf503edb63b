use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    backend::{Backend, Query, Subscription},
    error::AppError,
    feed::{FeedFilter, Post, PostDraft},
    media::{self, MediaKind},
    telemetry::ActionLogger,
};

pub struct FeedController<B: Backend> {
    backend: B,
    logger: Arc<dyn ActionLogger>,
    viewer_id: Uuid,
    page_size: usize,
    posts: Vec<Post>,
    liked: HashSet<Uuid>,
    stale: Arc<AtomicBool>,
    subscription: Option<Subscription>,
    composer: Option<PostDraft>,
}

impl<B: Backend> FeedController<B> {
    pub fn new(backend: B, logger: Arc<dyn ActionLogger>, viewer_id: Uuid, page_size: usize) -> Self {
        Self {
            backend,
            logger,
            viewer_id,
            page_size,
            posts: Vec::new(),
            liked: HashSet::new(),
            stale: Arc::new(AtomicBool::new(false)),
            subscription: None,
            composer: None,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn filtered(&self, filter: FeedFilter) -> Vec<&Post> {
        self.posts.iter().filter(|post| filter.matches(post)).collect()
    }

    pub fn is_liked(&self, post_id: Uuid) -> bool {
        self.liked.contains(&post_id)
    }

    /// Fetches the newest posts with their authors. On failure the current
    /// list is kept and `false` is returned.
    pub async fn load(&mut self) -> bool {
        let query = Query::new()
            .order_by("created_at", true)
            .embed("user", "users", "user_id")
            .limit(self.page_size);

        let records = match self.backend.query("posts", query).await {
            Ok(records) => records,
            Err(e) => {
                warn!("feed: failed to load posts: {}", e);
                return false;
            }
        };

        let posts: Vec<Post> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(post) => Some(post),
                Err(e) => {
                    warn!("feed: skipping malformed post: {}", e);
                    None
                }
            })
            .collect();

        info!("feed: loaded {} posts", posts.len());
        self.posts = posts;
        self.stale.store(false, Ordering::SeqCst);
        true
    }

    /// Marks the feed stale whenever a post is inserted anywhere.
    pub fn watch(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        let stale = self.stale.clone();
        self.subscription = Some(self.backend.subscribe(
            "posts",
            Arc::new(move |_record: &Value| {
                stale.store(true, Ordering::SeqCst);
            }),
        ));
    }

    pub fn unwatch(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }

    pub async fn refresh_if_stale(&mut self) -> bool {
        if !self.is_stale() {
            return false;
        }
        self.load().await
    }

    /// Returns the new liked state, or `None` for an unknown post.
    pub fn toggle_like(&mut self, post_id: Uuid) -> Option<bool> {
        let post = self.posts.iter_mut().find(|post| post.id == post_id)?;
        let liked = if self.liked.remove(&post_id) {
            post.likes = post.likes.saturating_sub(1);
            false
        } else {
            self.liked.insert(post_id);
            post.likes += 1;
            true
        };

        self.logger
            .log_event(if liked { "like" } else { "unlike" }, json!({ "post_id": post_id }));
        Some(liked)
    }

    pub fn record_comment(&mut self, post_id: Uuid) -> Option<u64> {
        let post = self.posts.iter_mut().find(|post| post.id == post_id)?;
        post.comments += 1;
        let count = post.comments;
        self.logger.log_event("comment", json!({ "post_id": post_id }));
        Some(count)
    }

    pub fn record_share(&mut self, post_id: Uuid) -> Option<u64> {
        let post = self.posts.iter_mut().find(|post| post.id == post_id)?;
        post.shares += 1;
        let count = post.shares;
        self.logger.log_event("share", json!({ "post_id": post_id }));
        Some(count)
    }

    pub fn composer(&self) -> Option<&PostDraft> {
        self.composer.as_ref()
    }

    pub fn open_composer(&mut self) {
        self.composer.get_or_insert_with(PostDraft::default);
    }

    pub fn close_composer(&mut self) {
        self.composer = None;
    }

    pub fn set_composer_content(&mut self, content: impl Into<String>) {
        if let Some(draft) = self.composer.as_mut() {
            draft.content = content.into();
        }
    }

    pub fn attach_media(&mut self, mime: &str) -> Result<MediaKind, AppError> {
        let kind = MediaKind::from_mime(mime)
            .filter(|_| media::is_accepted(mime))
            .ok_or_else(|| AppError::UnprocessableEntity(format!("Unsupported media type: {mime}")))?;
        debug!("feed: attached {} to the composer", kind.label());
        if let Some(draft) = self.composer.as_mut() {
            draft.media_kind = Some(kind);
        }
        Ok(kind)
    }

    /// Publishes the composer draft. The composer stays open with its draft
    /// when validation or the backend write fails.
    pub async fn submit_post(&mut self) -> Result<Post, AppError> {
        let draft = self
            .composer
            .clone()
            .ok_or(AppError::UnprocessableEntity("Composer is not open".to_string()))?;
        draft.validate()?;

        let record = json!({
            "id": Uuid::new_v4(),
            "user_id": self.viewer_id,
            "content": draft.content,
            "media_kind": draft.media_kind,
            "likes": 0,
            "comments": 0,
            "shares": 0,
            "created_at": Utc::now(),
        });

        let stored = self.backend.insert("posts", record).await.map_err(|e| {
            warn!("feed: failed to create post: {}", e);
            e
        })?;
        let post: Post = serde_json::from_value(stored)?;

        debug!("feed: created post {}", post.id);
        self.composer = None;
        self.posts.insert(0, post.clone());
        self.logger.log_event("post_create", json!({ "post_id": post.id }));
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::MockBackend, telemetry::NoopLogger};

    fn controller(backend: &MockBackend) -> FeedController<MockBackend> {
        FeedController::new(backend.clone(), Arc::new(NoopLogger), Uuid::new_v4(), 20)
    }

    #[tokio::test]
    async fn loads_newest_first_with_authors() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);

        assert!(feed.load().await);
        let posts = feed.posts();
        assert_eq!(posts.len(), 4);
        assert!(posts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(posts[0].author.as_ref().unwrap().name, "Mira Vale");
    }

    #[tokio::test]
    async fn role_filter_narrows_the_list() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.load().await;

        assert_eq!(feed.filtered(FeedFilter::All).len(), 4);
        assert_eq!(feed.filtered(FeedFilter::Artists).len(), 2);
        assert_eq!(feed.filtered(FeedFilter::Producers).len(), 1);
        assert_eq!(feed.filtered(FeedFilter::Fans).len(), 1);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_posts() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.load().await;

        backend.set_offline(true);
        assert!(!feed.load().await);
        assert_eq!(feed.posts().len(), 4);
    }

    #[tokio::test]
    async fn likes_toggle_and_counters_increment() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.load().await;
        let post = feed.posts()[0].clone();

        assert_eq!(feed.toggle_like(post.id), Some(true));
        assert_eq!(feed.posts()[0].likes, post.likes + 1);
        assert_eq!(feed.toggle_like(post.id), Some(false));
        assert_eq!(feed.posts()[0].likes, post.likes);

        assert_eq!(feed.record_comment(post.id), Some(post.comments + 1));
        assert_eq!(feed.record_share(post.id), Some(post.shares + 1));
        assert_eq!(feed.toggle_like(Uuid::new_v4()), None);
    }

    #[tokio::test]
    async fn inserts_mark_a_watched_feed_stale() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.load().await;
        feed.watch();

        let mut other = controller(&backend);
        other.open_composer();
        other.set_composer_content("fresh upload");
        other.submit_post().await.unwrap();

        assert!(feed.is_stale());
        assert!(feed.refresh_if_stale().await);
        assert_eq!(feed.posts().len(), 5);
        assert!(!feed.is_stale());

        feed.unwatch();
        assert_eq!(backend.subscriber_count("posts"), 0);
    }

    #[tokio::test]
    async fn failed_submit_keeps_the_composer_open() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.open_composer();
        feed.set_composer_content("new track out now");
        feed.attach_media("audio/wav").unwrap();

        backend.set_offline(true);
        assert!(matches!(
            feed.submit_post().await,
            Err(AppError::Backend(_))
        ));
        assert_eq!(
            feed.composer().map(|d| d.content.as_str()),
            Some("new track out now")
        );

        backend.set_offline(false);
        let post = feed.submit_post().await.unwrap();
        assert_eq!(post.media_kind, Some(MediaKind::Audio));
        assert!(feed.composer().is_none());
        assert_eq!(feed.posts()[0].id, post.id);
    }

    #[test]
    fn composer_rejects_unsupported_files() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.open_composer();

        assert_eq!(feed.attach_media("image/jpeg").unwrap(), MediaKind::Photo);
        assert!(matches!(
            feed.attach_media("text/plain"),
            Err(AppError::UnprocessableEntity(_))
        ));
        assert_eq!(feed.composer().unwrap().media_kind, Some(MediaKind::Photo));
    }

    #[tokio::test]
    async fn empty_post_is_rejected() {
        let backend = MockBackend::seeded();
        let mut feed = controller(&backend);
        feed.open_composer();
        assert!(matches!(
            feed.submit_post().await,
            Err(AppError::UnprocessableEntity(_))
        ));
        assert_eq!(backend.row_count("posts"), 4);
    }
}
