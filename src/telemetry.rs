use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::backend::Backend;

/// Fire-and-forget action log. Implementations must never surface failures.
pub trait ActionLogger: Send + Sync {
    fn log_event(&self, kind: &str, payload: Value);
}

/// Writes actions to the backend's `user_actions` table.
#[derive(Clone)]
pub struct BackendActionLogger<B: Backend> {
    backend: B,
    username: String,
}

impl<B: Backend> BackendActionLogger<B> {
    pub fn new(backend: B, username: impl Into<String>) -> Self {
        Self {
            backend,
            username: username.into(),
        }
    }
}

impl<B: Backend> ActionLogger for BackendActionLogger<B> {
    fn log_event(&self, kind: &str, payload: Value) {
        let record = json!({
            "kind": kind,
            "username": self.username,
            "payload": payload,
            "logged_at": Utc::now(),
        });

        // Outside a runtime there is nowhere to send it.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("telemetry: no runtime, dropping {} event", kind);
            return;
        };

        let backend = self.backend.clone();
        let kind = kind.to_string();
        runtime.spawn(async move {
            if let Err(e) = backend.insert("user_actions", record).await {
                warn!("telemetry: failed to log {} event: {}", kind, e);
            }
        });
    }
}

/// Discards everything.
pub struct NoopLogger;

impl ActionLogger for NoopLogger {
    fn log_event(&self, _kind: &str, _payload: Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::time::Duration;

    #[tokio::test]
    async fn events_land_in_user_actions() {
        let backend = MockBackend::new();
        let logger = BackendActionLogger::new(backend.clone(), "mira");

        logger.log_event("story_view", json!({ "story_id": "s1" }));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(backend.row_count("user_actions"), 1);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let backend = MockBackend::new();
        backend.set_offline(true);
        let logger = BackendActionLogger::new(backend.clone(), "mira");

        logger.log_event("like", json!({}));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(backend.row_count("user_actions"), 0);
    }

    #[test]
    fn logging_without_a_runtime_is_a_no_op() {
        let backend = MockBackend::new();
        BackendActionLogger::new(backend.clone(), "mira").log_event("like", json!({}));
        assert_eq!(backend.row_count("user_actions"), 0);
    }
}
