//! Playback state machine for the story viewer.
//!
//! Time is passed in as `now_ms` on every call. Scheduled work (the
//! post-completion grace delay and the navigation debounce) is kept as
//! deadlines on the session, so cancelling a timer means clearing a field and
//! closing the viewer drops every pending deadline with the session.

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    config::settings::{PlaybackTiming, ViewerIdentity},
    error::AppError,
    stories::{
        navigation::{self, Direction},
        overlay, Reel, ReelItem, Story,
    },
};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Closed,
    Loading,
    Playing,
    Paused,
    Errored,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum NavigationOutcome {
    Moved { index: usize },
    /// Backward from the first story: nothing to go back to.
    Stayed,
    Closed,
    /// A previous navigation is still settling.
    Locked,
    NotOpen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickResult {
    NoRender,
    RenderRequested,
    Navigated(NavigationOutcome),
}

/// Per-open state of the viewer. Created on open, replaced on every
/// navigation, dropped on close.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerSession {
    selected_story_id: Uuid,
    current_index: usize,
    is_playing: bool,
    progress: f32,
    is_image_loaded: bool,
    is_image_errored: bool,
    is_analytics_open: bool,
    /// Instant at which progress would have been zero at the current rate.
    anchor_ms: u64,
    completion_due_ms: Option<u64>,
    navigation_locked_until_ms: u64,
}

impl ViewerSession {
    /// Fresh per-story state. Navigation stays refused until
    /// `navigation_locked_until_ms`.
    fn start(story_id: Uuid, index: usize, now_ms: u64, navigation_locked_until_ms: u64) -> Self {
        Self {
            selected_story_id: story_id,
            current_index: index,
            is_playing: true,
            progress: 0.0,
            is_image_loaded: false,
            is_image_errored: false,
            is_analytics_open: false,
            anchor_ms: now_ms,
            completion_due_ms: None,
            navigation_locked_until_ms,
        }
    }

    pub fn selected_story_id(&self) -> Uuid {
        self.selected_story_id
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_image_loaded(&self) -> bool {
        self.is_image_loaded
    }

    pub fn is_image_errored(&self) -> bool {
        self.is_image_errored
    }

    pub fn is_analytics_open(&self) -> bool {
        self.is_analytics_open
    }

    pub fn completion_pending(&self) -> bool {
        self.completion_due_ms.is_some()
    }

    fn state(&self) -> PlaybackState {
        if self.is_image_errored {
            PlaybackState::Errored
        } else if !self.is_image_loaded {
            PlaybackState::Loading
        } else if self.is_playing && !self.is_analytics_open {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    fn is_advancing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Brings progress up to `now_ms`. Never moves it backwards.
    fn sample(&mut self, now_ms: u64, duration_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.anchor_ms);
        let fraction = (elapsed as f64 / duration_ms.max(1) as f64).min(1.0) as f32;
        self.progress = self.progress.max(fraction);
    }

    /// Moves the time reference so the frozen progress continues from `now_ms`.
    fn reanchor(&mut self, now_ms: u64, duration_ms: u64) {
        let covered = (f64::from(self.progress) * duration_ms as f64) as u64;
        self.anchor_ms = now_ms.saturating_sub(covered);
    }

    fn freeze(&mut self, now_ms: u64, duration_ms: u64) {
        if self.is_advancing() {
            self.sample(now_ms, duration_ms);
        }
        self.is_playing = false;
        self.completion_due_ms = None;
    }
}

/// Read-only view of the viewer published to observers.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ViewerSnapshot {
    pub state: PlaybackState,
    pub story_id: Option<Uuid>,
    pub index: Option<usize>,
    pub progress: f32,
    pub analytics_open: bool,
    pub analytics_available: bool,
}

pub struct StoryViewer {
    reel: Reel,
    identity: ViewerIdentity,
    timing: PlaybackTiming,
    session: Option<ViewerSession>,
}

impl StoryViewer {
    pub fn new(reel: Reel, identity: ViewerIdentity, timing: PlaybackTiming) -> Self {
        Self {
            reel,
            identity,
            timing,
            session: None,
        }
    }

    pub fn reel(&self) -> &Reel {
        &self.reel
    }

    pub fn identity(&self) -> &ViewerIdentity {
        &self.identity
    }

    pub fn timing(&self) -> &PlaybackTiming {
        &self.timing
    }

    pub fn session(&self) -> Option<&ViewerSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn state(&self) -> PlaybackState {
        self.session
            .as_ref()
            .map_or(PlaybackState::Closed, ViewerSession::state)
    }

    pub fn progress(&self) -> f32 {
        self.session.as_ref().map_or(0.0, ViewerSession::progress)
    }

    pub fn current_story(&self) -> Option<&Story> {
        self.session
            .as_ref()
            .and_then(|session| self.reel.story_at(session.current_index))
    }

    pub fn analytics_available(&self) -> bool {
        overlay::analytics_visible(self.is_open(), self.current_story(), &self.identity)
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            state: self.state(),
            story_id: self.session.as_ref().map(ViewerSession::selected_story_id),
            index: self.session.as_ref().map(ViewerSession::current_index),
            progress: self.progress(),
            analytics_open: self
                .session
                .as_ref()
                .is_some_and(ViewerSession::is_analytics_open),
            analytics_available: self.analytics_available(),
        }
    }

    /// Replaces the reel, e.g. after the feed was refreshed. An open session
    /// follows its story to the new position or closes if it disappeared.
    pub fn replace_reel(&mut self, reel: Reel) {
        self.reel = reel;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.reel.position(session.selected_story_id) {
            Some(index) => session.current_index = index,
            None => {
                debug!(
                    "reel: selected story {} vanished after refresh, closing",
                    session.selected_story_id
                );
                self.session = None;
            }
        }
    }

    pub fn open(&mut self, story_id: Uuid, now_ms: u64) -> Result<(), AppError> {
        let index = self
            .reel
            .position(story_id)
            .ok_or(AppError::NotFound("Story not found".to_string()))?;
        self.open_at(index, now_ms)
    }

    pub fn open_at(&mut self, index: usize, now_ms: u64) -> Result<(), AppError> {
        let story_id = match self.reel.get(index) {
            Some(ReelItem::Story(story)) => story.id,
            Some(ReelItem::AddStory) => return Err(AppError::NotPlayable),
            None => return Err(AppError::NotFound("Story not found".to_string())),
        };

        debug!("reel: open story_id={} index={}", story_id, index);
        self.session = Some(ViewerSession::start(story_id, index, now_ms, now_ms));
        Ok(())
    }

    /// Media for `story_id` finished loading. Events for any other story are
    /// stale and ignored.
    pub fn media_loaded(&mut self, story_id: Uuid, now_ms: u64) -> bool {
        let duration_ms = self.current_duration_ms();
        let Some(session) = self.session_for(story_id) else {
            return false;
        };
        if session.is_image_loaded || session.is_image_errored {
            return false;
        }

        session.is_image_loaded = true;
        session.reanchor(now_ms, duration_ms);
        debug!("reel: media loaded story_id={}", story_id);
        true
    }

    pub fn media_failed(&mut self, story_id: Uuid) -> bool {
        let Some(session) = self.session_for(story_id) else {
            return false;
        };
        if session.is_image_loaded {
            return false;
        }

        session.is_image_errored = true;
        session.completion_due_ms = None;
        debug!("reel: media failed story_id={}", story_id);
        true
    }

    pub fn retry_media(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.is_image_errored {
            return false;
        }

        session.is_image_errored = false;
        session.is_image_loaded = false;
        session.is_playing = true;
        session.progress = 0.0;
        true
    }

    /// Playing <-> Paused. Has no effect while loading, errored, or behind
    /// the analytics panel.
    pub fn toggle(&mut self, now_ms: u64) -> bool {
        let duration_ms = self.current_duration_ms();
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        match session.state() {
            PlaybackState::Playing => {
                session.freeze(now_ms, duration_ms);
                debug!("reel: paused at progress={:.3}", session.progress);
                true
            }
            PlaybackState::Paused if !session.is_analytics_open => {
                session.is_playing = true;
                session.reanchor(now_ms, duration_ms);
                debug!("reel: resumed at progress={:.3}", session.progress);
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, now_ms: u64) -> TickResult {
        let duration_ms = self.current_duration_ms();
        let grace_ms = self.timing.completion_grace_ms;

        let (changed, completion_due) = {
            let Some(session) = self.session.as_mut() else {
                return TickResult::NoRender;
            };
            if !session.is_advancing() {
                return TickResult::NoRender;
            }

            let before = session.progress;
            session.sample(now_ms, duration_ms);

            if session.progress >= 1.0 && session.completion_due_ms.is_none() {
                session.completion_due_ms = Some(now_ms.saturating_add(grace_ms));
                debug!(
                    "reel: story {} complete, advancing in {}ms",
                    session.selected_story_id, grace_ms
                );
            }

            let due = session.completion_due_ms.is_some_and(|due| now_ms >= due);
            (session.progress != before, due)
        };

        if completion_due {
            let outcome = self.advance(Direction::Forward, now_ms);
            // A refused advance keeps its deadline and retries on the next frame.
            if outcome != NavigationOutcome::Locked {
                if let Some(session) = self.session.as_mut() {
                    session.completion_due_ms = None;
                }
            }
            return TickResult::Navigated(outcome);
        }
        if changed {
            TickResult::RenderRequested
        } else {
            TickResult::NoRender
        }
    }

    pub fn advance(&mut self, direction: Direction, now_ms: u64) -> NavigationOutcome {
        let Some(session) = self.session.as_ref() else {
            return NavigationOutcome::NotOpen;
        };
        if now_ms < session.navigation_locked_until_ms {
            debug!("reel: navigation ignored, previous transition settling");
            return NavigationOutcome::Locked;
        }

        let from = session.current_index;
        match navigation::resolve(self.reel.items(), from, direction) {
            Some(index) => {
                let Some(story) = self.reel.story_at(index) else {
                    return NavigationOutcome::Stayed;
                };
                debug!(
                    "reel: navigate {:?} from={} to={} story_id={}",
                    direction, from, index, story.id
                );
                let locked_until = now_ms.saturating_add(self.timing.navigation_debounce_ms);
                self.session = Some(ViewerSession::start(story.id, index, now_ms, locked_until));
                NavigationOutcome::Moved { index }
            }
            None if direction == Direction::Forward => {
                debug!("reel: reached end of reel at index={}, closing", from);
                self.close();
                NavigationOutcome::Closed
            }
            None => NavigationOutcome::Stayed,
        }
    }

    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("reel: close story_id={}", session.selected_story_id);
        }
    }

    /// Opens the analytics panel, pausing playback. Refused when the gate
    /// does not allow the panel for this story and viewer.
    pub fn open_analytics(&mut self, now_ms: u64) -> bool {
        if !self.analytics_available() {
            return false;
        }
        let duration_ms = self.current_duration_ms();
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        session.freeze(now_ms, duration_ms);
        session.is_analytics_open = true;
        true
    }

    /// Closes the analytics panel; playback resumes only if media loaded.
    pub fn close_analytics(&mut self, now_ms: u64) -> bool {
        let duration_ms = self.current_duration_ms();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.is_analytics_open {
            return false;
        }

        session.is_analytics_open = false;
        if session.is_image_loaded && !session.is_image_errored {
            session.is_playing = true;
            session.reanchor(now_ms, duration_ms);
        }
        true
    }

    fn session_for(&mut self, story_id: Uuid) -> Option<&mut ViewerSession> {
        self.session
            .as_mut()
            .filter(|session| session.selected_story_id == story_id)
    }

    fn current_duration_ms(&self) -> u64 {
        match self.current_story() {
            Some(story) if story.content.duration_seconds > 0 => {
                u64::from(story.content.duration_seconds) * 1_000
            }
            _ => self.timing.default_duration_ms,
        }
    }
}
