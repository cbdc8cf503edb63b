use std::env;
use std::str::FromStr;

use crate::stories::Role;

/// Timing knobs for the story reel, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackTiming {
    pub frame_interval_ms: u64,
    pub completion_grace_ms: u64,
    pub navigation_debounce_ms: u64,
    pub default_duration_ms: u64,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            completion_grace_ms: 200,
            navigation_debounce_ms: 100,
            default_duration_ms: 15_000,
        }
    }
}

/// Who is looking at the screen.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerIdentity {
    pub username: String,
    pub role: Role,
    pub privileged: bool,
}

impl ViewerIdentity {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
            privileged: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub timing: PlaybackTiming,
    pub scroll_step_px: f32,
    pub feed_page_size: usize,
    pub identity: ViewerIdentity,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timing: PlaybackTiming::default(),
            scroll_step_px: 300.0,
            feed_page_size: 20,
            identity: ViewerIdentity::new("guest", Role::Fan),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        let defaults = Settings::default();

        let timing = PlaybackTiming {
            frame_interval_ms: env_or("REEL_FRAME_INTERVAL_MS", defaults.timing.frame_interval_ms)
                .max(1),
            completion_grace_ms: env_or(
                "REEL_COMPLETION_GRACE_MS",
                defaults.timing.completion_grace_ms,
            ),
            navigation_debounce_ms: env_or(
                "REEL_NAVIGATION_DEBOUNCE_MS",
                defaults.timing.navigation_debounce_ms,
            ),
            default_duration_ms: env_or::<u64>("REEL_DEFAULT_DURATION_SECS", 15)
                .max(1)
                .saturating_mul(1_000),
        };

        let identity = ViewerIdentity {
            username: env::var("VIEWER_USERNAME").unwrap_or(defaults.identity.username),
            role: env_or("VIEWER_ROLE", defaults.identity.role),
            privileged: env_or("VIEWER_PRIVILEGED", false),
        };

        Self {
            timing,
            scroll_step_px: env_or("RAIL_SCROLL_STEP_PX", defaults.scroll_step_px),
            feed_page_size: env_or("FEED_PAGE_SIZE", defaults.feed_page_size),
            identity,
        }
    }

    pub fn playback_timing(&self) -> PlaybackTiming {
        self.timing
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
