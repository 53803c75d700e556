//! Questionnaire session registry
//!
//! Holds the in-process state of every user currently walking through the
//! questionnaire, together with the cancellation token of their inactivity
//! timer. Answers are mirrored to PostgreSQL on every mutation, so a session
//! can be rebuilt from storage after a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use teloxide::types::MessageId;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Ephemeral state of one user's questionnaire run
#[derive(Debug, Clone)]
pub struct Session {
    /// Identifier of the `data_questions` row this run writes to
    pub request_id: i64,
    /// Owner reference copied onto every stored answer
    pub root: i64,
    /// Index of the question currently shown (0-based)
    pub current_index: usize,
    /// Toggled option answers per step
    answers: BTreeMap<usize, Vec<String>>,
    /// Free-text answer per step (at most one)
    custom_answers: BTreeMap<usize, String>,
    /// Message id of the open question prompt, deleted on expiry/interrupt
    pub prompt_message: Option<MessageId>,
    /// Message id of the "use the custom answer button" hint, if shown
    pub hint_message: Option<MessageId>,
}

impl Session {
    /// Create a fresh session positioned at `start_index`
    #[must_use]
    pub fn new(request_id: i64, root: i64, start_index: usize) -> Self {
        Self {
            request_id,
            root,
            current_index: start_index,
            answers: BTreeMap::new(),
            custom_answers: BTreeMap::new(),
            prompt_message: None,
            hint_message: None,
        }
    }

    /// Re-add an answer persisted by an earlier run (used when resuming)
    pub fn restore_answer(&mut self, step: usize, text: String, is_custom: bool) {
        if is_custom {
            self.custom_answers.insert(step, text);
        } else {
            let selected = self.answers.entry(step).or_default();
            if !selected.contains(&text) {
                selected.push(text);
            }
        }
    }

    /// Options currently selected on a step
    #[must_use]
    pub fn selected(&self, step: usize) -> &[String] {
        self.answers.get(&step).map_or(&[], Vec::as_slice)
    }

    /// Toggle an option on a step; returns `true` when it was added and
    /// `false` when an existing selection was removed
    pub fn toggle(&mut self, step: usize, text: &str) -> bool {
        let selected = self.answers.entry(step).or_default();
        if let Some(pos) = selected.iter().position(|a| a == text) {
            selected.remove(pos);
            false
        } else {
            selected.push(text.to_string());
            true
        }
    }

    /// The free-text answer of a step, if any
    #[must_use]
    pub fn custom(&self, step: usize) -> Option<&str> {
        self.custom_answers.get(&step).map(String::as_str)
    }

    /// Store (or replace) the free-text answer of a step
    pub fn set_custom(&mut self, step: usize, text: String) {
        self.custom_answers.insert(step, text);
    }

    /// Remove the free-text answer of a step, returning the removed text
    pub fn clear_custom(&mut self, step: usize) -> Option<String> {
        self.custom_answers.remove(&step)
    }

    /// Move to the next question; clamped at the final step. Returns whether
    /// the index changed.
    pub fn advance(&mut self, total: usize) -> bool {
        if self.current_index + 1 < total {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous question; clamped at the first step. Returns
    /// whether the index changed.
    pub fn retreat(&mut self) -> bool {
        if self.current_index > 0 {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }
}

/// Registry of active questionnaire sessions keyed by Telegram user id
///
/// Sessions and timer tokens are kept in separate maps so a timer can be
/// rearmed without holding a session lock.
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Arc<RwLock<Session>>>>,
    timers: RwLock<HashMap<i64, CancellationToken>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            timers: RwLock::new(HashMap::new()),
        }
    }

    /// Insert (or replace) a user's session, returning the shared handle
    pub async fn insert(&self, user_id: i64, session: Session) -> Arc<RwLock<Session>> {
        let session = Arc::new(RwLock::new(session));
        let mut sessions = self.sessions.write().await;
        sessions.insert(user_id, session.clone());
        session
    }

    /// The session of a user, if one is active
    pub async fn get(&self, user_id: i64) -> Option<Arc<RwLock<Session>>> {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).cloned()
    }

    /// Drop a user's session and cancel their inactivity timer. Returns the
    /// removed session so callers can clean up its open messages.
    pub async fn remove(&self, user_id: i64) -> Option<Arc<RwLock<Session>>> {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&user_id)
        };
        let mut timers = self.timers.write().await;
        if let Some(token) = timers.remove(&user_id) {
            token.cancel();
            debug!(user_id, "inactivity timer cancelled");
        }
        removed
    }

    /// Cancel the previous inactivity timer of a user and hand out a fresh
    /// token for the next one
    pub async fn rearm_timer(&self, user_id: i64) -> CancellationToken {
        let mut timers = self.timers.write().await;
        if let Some(old) = timers.remove(&user_id) {
            old.cancel();
        }
        let token = CancellationToken::new();
        timers.insert(user_id, token.clone());
        token
    }

    /// Number of active sessions
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Whether no session is active
    pub async fn is_empty(&self) -> bool {
        let sessions = self.sessions.read().await;
        sessions.is_empty()
    }
}
