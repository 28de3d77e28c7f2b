use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::SessionState;

use super::conversation_controller::{ConversationController, TurnOutcome};

struct SessionSlot {
    state: Arc<Mutex<SessionState>>,
    last_seen: Instant,
}

/// Owns the live sessions.
///
/// Turns of one session are serialized by that session's lock; different
/// sessions only contend on the short map lookup. Sessions idle for longer
/// than the idle timeout are dropped when a new session is opened, and the
/// least recently used one goes first once the cap is reached.
pub struct SessionManager {
    controller: Arc<ConversationController>,
    sessions: Mutex<HashMap<String, SessionSlot>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl SessionManager {
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);
    pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

    pub fn new(controller: Arc<ConversationController>) -> Self {
        Self {
            controller,
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            max_sessions: Self::DEFAULT_MAX_SESSIONS,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// At least one session is always kept.
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    /// Opens a session under a fresh id.
    pub async fn start_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.session(&id).await;
        id
    }

    /// Handles one utterance, creating the session on its first message.
    pub async fn handle(&self, session_id: &str, utterance: &str) -> TurnOutcome {
        let session = self.session(session_id).await;
        let mut state = session.lock().await;
        self.controller.handle_turn(&mut state, utterance).await
    }

    /// Discards a session. Returns whether it existed.
    pub async fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id).is_some();
        if removed {
            info!("Ended session {}", session_id);
        }
        removed
    }

    pub async fn snapshot(&self, session_id: &str) -> Option<SessionState> {
        let session = self
            .sessions
            .lock()
            .await
            .get(session_id)
            .map(|slot| Arc::clone(&slot.state))?;
        let state = session.lock().await;
        Some(state.clone())
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn session(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();
        if let Some(slot) = sessions.get_mut(session_id) {
            slot.last_seen = now;
            return Arc::clone(&slot.state);
        }

        self.evict(&mut sessions, now);
        debug!("Starting session {}", session_id);
        let state = Arc::new(Mutex::new(SessionState::new(session_id)));
        sessions.insert(
            session_id.to_string(),
            SessionSlot {
                state: Arc::clone(&state),
                last_seen: now,
            },
        );
        state
    }

    /// Makes room for one more session.
    fn evict(&self, sessions: &mut HashMap<String, SessionSlot>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, slot| now.duration_since(slot.last_seen) <= self.idle_timeout);
        if sessions.len() < before {
            info!("Expired {} idle session(s)", before - sessions.len());
        }

        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    info!("Session limit reached, dropping {}", id);
                    sessions.remove(&id);
                }
                None => break,
            }
        }
    }
}
