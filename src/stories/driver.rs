//! Runs a [`StoryViewer`] on the tokio runtime: commands from the UI come in
//! over a channel, a frame interval drives progress while the viewer is open,
//! and every change is published as a [`ViewerSnapshot`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::AppError,
    stories::{
        navigation::Direction,
        player::{NavigationOutcome, StoryViewer, TickResult, ViewerSnapshot},
        Reel,
    },
    telemetry::ActionLogger,
};

enum ReelCommand {
    Open {
        story_id: Uuid,
        reply: oneshot::Sender<Result<(), AppError>>,
    },
    MediaLoaded(Uuid),
    MediaFailed(Uuid),
    RetryMedia,
    Toggle,
    Navigate(Direction),
    OpenAnalytics,
    CloseAnalytics,
    Close,
    ReplaceReel(Reel),
}

/// Cloneable handle the UI uses to drive the reel. The driver stops once
/// every handle is dropped.
#[derive(Clone)]
pub struct ReelHandle {
    commands: mpsc::UnboundedSender<ReelCommand>,
    snapshots: watch::Receiver<ViewerSnapshot>,
}

impl ReelHandle {
    pub async fn open(&self, story_id: Uuid) -> Result<(), AppError> {
        let (reply, response) = oneshot::channel();
        self.send(ReelCommand::Open { story_id, reply })?;
        response.await.map_err(|_| AppError::DriverClosed)?
    }

    pub fn media_loaded(&self, story_id: Uuid) -> Result<(), AppError> {
        self.send(ReelCommand::MediaLoaded(story_id))
    }

    pub fn media_failed(&self, story_id: Uuid) -> Result<(), AppError> {
        self.send(ReelCommand::MediaFailed(story_id))
    }

    pub fn retry_media(&self) -> Result<(), AppError> {
        self.send(ReelCommand::RetryMedia)
    }

    pub fn toggle(&self) -> Result<(), AppError> {
        self.send(ReelCommand::Toggle)
    }

    pub fn next(&self) -> Result<(), AppError> {
        self.send(ReelCommand::Navigate(Direction::Forward))
    }

    pub fn previous(&self) -> Result<(), AppError> {
        self.send(ReelCommand::Navigate(Direction::Backward))
    }

    pub fn open_analytics(&self) -> Result<(), AppError> {
        self.send(ReelCommand::OpenAnalytics)
    }

    pub fn close_analytics(&self) -> Result<(), AppError> {
        self.send(ReelCommand::CloseAnalytics)
    }

    pub fn close(&self) -> Result<(), AppError> {
        self.send(ReelCommand::Close)
    }

    pub fn replace_reel(&self, reel: Reel) -> Result<(), AppError> {
        self.send(ReelCommand::ReplaceReel(reel))
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ViewerSnapshot> {
        self.snapshots.clone()
    }

    fn send(&self, command: ReelCommand) -> Result<(), AppError> {
        self.commands
            .send(command)
            .map_err(|_| AppError::DriverClosed)
    }
}

pub struct ReelDriver {
    viewer: StoryViewer,
    logger: Arc<dyn ActionLogger>,
    commands: mpsc::UnboundedReceiver<ReelCommand>,
    snapshots: watch::Sender<ViewerSnapshot>,
    started: Instant,
}

impl ReelDriver {
    pub fn spawn(viewer: StoryViewer, logger: Arc<dyn ActionLogger>) -> (ReelHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(viewer.snapshot());

        let driver = ReelDriver {
            viewer,
            logger,
            commands: command_rx,
            snapshots: snapshot_tx,
            started: Instant::now(),
        };
        let task = tokio::spawn(driver.run());

        let handle = ReelHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        (handle, task)
    }

    async fn run(mut self) {
        let frame = Duration::from_millis(self.viewer.timing().frame_interval_ms.max(1));
        let mut frames = tokio::time::interval(frame);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("reel driver started, frame interval {:?}", frame);
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.apply(command);
                }
                _ = frames.tick(), if self.viewer.is_open() => {
                    let now_ms = self.now_ms();
                    if let TickResult::Navigated(outcome) = self.viewer.tick(now_ms) {
                        self.log_navigation(outcome, "auto");
                    }
                }
            }
            self.publish();
        }

        // Teardown: nothing may fire after the last handle is gone.
        self.viewer.close();
        self.publish();
        info!("reel driver stopped");
    }

    fn apply(&mut self, command: ReelCommand) {
        let now_ms = self.now_ms();
        match command {
            ReelCommand::Open { story_id, reply } => {
                let result = self.viewer.open(story_id, now_ms);
                if result.is_ok() {
                    self.log_view("open");
                }
                let _ = reply.send(result);
            }
            ReelCommand::MediaLoaded(story_id) => {
                self.viewer.media_loaded(story_id, now_ms);
            }
            ReelCommand::MediaFailed(story_id) => {
                self.viewer.media_failed(story_id);
            }
            ReelCommand::RetryMedia => {
                self.viewer.retry_media();
            }
            ReelCommand::Toggle => {
                self.viewer.toggle(now_ms);
            }
            ReelCommand::Navigate(direction) => {
                let outcome = self.viewer.advance(direction, now_ms);
                self.log_navigation(outcome, "manual");
            }
            ReelCommand::OpenAnalytics => {
                if self.viewer.open_analytics(now_ms) {
                    if let Some(story) = self.viewer.current_story() {
                        self.logger
                            .log_event("story_analytics_open", json!({ "story_id": story.id }));
                    }
                }
            }
            ReelCommand::CloseAnalytics => {
                self.viewer.close_analytics(now_ms);
            }
            ReelCommand::Close => {
                self.viewer.close();
                self.logger.log_event("story_close", json!({ "trigger": "manual" }));
            }
            ReelCommand::ReplaceReel(reel) => {
                debug!("reel driver: replacing reel with {} slots", reel.len());
                self.viewer.replace_reel(reel);
            }
        }
    }

    fn log_navigation(&self, outcome: NavigationOutcome, trigger: &str) {
        match outcome {
            NavigationOutcome::Moved { .. } => self.log_view(trigger),
            NavigationOutcome::Closed => {
                self.logger
                    .log_event("story_close", json!({ "trigger": trigger, "reason": "end_of_reel" }));
            }
            _ => {}
        }
    }

    fn log_view(&self, trigger: &str) {
        if let (Some(story), Some(session)) = (self.viewer.current_story(), self.viewer.session()) {
            self.logger.log_event(
                "story_view",
                json!({
                    "story_id": story.id,
                    "index": session.current_index(),
                    "trigger": trigger,
                }),
            );
        }
    }

    fn publish(&self) {
        let snapshot = self.viewer.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::settings::{PlaybackTiming, ViewerIdentity},
        stories::{fixtures, player::PlaybackState, Role, Story},
        telemetry::NoopLogger,
    };
    use tokio::time::timeout;

    const LIMIT: Duration = Duration::from_secs(120);

    fn spawn(stories: Vec<Story>) -> (ReelHandle, JoinHandle<()>) {
        let viewer = StoryViewer::new(
            Reel::new(stories),
            ViewerIdentity::new("listener", Role::Artist),
            PlaybackTiming::default(),
        );
        ReelDriver::spawn(viewer, Arc::new(NoopLogger))
    }

    #[tokio::test(start_paused = true)]
    async fn plays_through_the_reel_and_closes_at_the_end() {
        let s1 = fixtures::story("mira", 1);
        let s2 = fixtures::story("oko", 1);
        let (id1, id2) = (s1.id, s2.id);
        let (handle, _task) = spawn(vec![s1, s2]);
        let mut rx = handle.watch();

        handle.open(id1).await.unwrap();
        handle.media_loaded(id1).unwrap();

        let snapshot = timeout(LIMIT, rx.wait_for(|s| s.story_id == Some(id2)))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert_eq!(snapshot.state, PlaybackState::Loading);
        assert_eq!(snapshot.progress, 0.0);

        handle.media_loaded(id2).unwrap();
        timeout(LIMIT, rx.wait_for(|s| s.state == PlaybackState::Closed))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn completion_advances_only_one_slot() {
        let stories = vec![
            fixtures::story("a", 1),
            fixtures::story("b", 1),
            fixtures::story("c", 1),
        ];
        let first = stories[0].id;
        let (handle, _task) = spawn(stories);
        let mut rx = handle.watch();

        handle.open(first).await.unwrap();
        handle.media_loaded(first).unwrap();
        timeout(LIMIT, rx.wait_for(|s| s.index == Some(2)))
            .await
            .unwrap()
            .unwrap();

        // The next story never loads, so nothing else may fire.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = handle.snapshot();
        assert_eq!(snapshot.index, Some(2));
        assert_eq!(snapshot.state, PlaybackState::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_progress_stays_frozen() {
        let story = fixtures::story("mira", 10);
        let id = story.id;
        let (handle, _task) = spawn(vec![story]);

        handle.open(id).await.unwrap();
        handle.media_loaded(id).unwrap();
        tokio::time::sleep(Duration::from_millis(2_000)).await;

        handle.toggle().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let paused = handle.snapshot();
        assert_eq!(paused.state, PlaybackState::Paused);
        assert!(paused.progress > 0.1 && paused.progress < 0.3);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.snapshot().progress, paused.progress);
    }

    #[tokio::test(start_paused = true)]
    async fn opening_unknown_story_reports_not_found() {
        let (handle, _task) = spawn(vec![fixtures::story("mira", 5)]);
        assert!(matches!(
            handle.open(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(handle.snapshot().state, PlaybackState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_every_handle_stops_the_driver() {
        let story = fixtures::story("mira", 5);
        let id = story.id;
        let (handle, task) = spawn(vec![story]);
        let rx = handle.watch();

        handle.open(id).await.unwrap();
        drop(handle);

        timeout(LIMIT, task).await.unwrap().unwrap();
        assert_eq!(rx.borrow().state, PlaybackState::Closed);
    }
}
