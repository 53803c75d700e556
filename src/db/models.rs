//! Row structs mapped from query results

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// `answer_type` value for answers picked from the option list
pub const ANSWER_KIND_BUTTON: &str = "button";
/// `answer_type` value for free-text answers
pub const ANSWER_KIND_CUSTOM: &str = "custom";

/// A row from the `users_designer` table
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    /// Telegram user id (primary key)
    pub id_telegram: i64,
    /// Telegram username, when set
    pub tg_login: Option<String>,
    /// First name snapshot
    pub tg_firstname: Option<String>,
    /// Last name snapshot
    pub tg_lastname: Option<String>,
    /// 1 while a questionnaire run is in progress, 0 otherwise
    pub status: i16,
    /// Confirmed phone number
    pub phone: Option<String>,
    /// 1-based number of the question currently shown; 0 = none
    pub last_step: i32,
    /// Reserved subscription flag
    pub subscribe: i16,
    /// Owner reference (first operator id)
    pub root: i64,
}

impl UserRecord {
    /// Whether a questionnaire run is currently in progress
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.status == 1
    }

    /// The 0-based step index to resume at
    #[must_use]
    pub fn resume_index(&self) -> usize {
        usize::try_from(self.last_step.max(1) - 1).unwrap_or_default()
    }
}

/// A row from the `data_questions` table: one questionnaire run
#[derive(Debug, Clone, FromRow)]
pub struct RequestRecord {
    /// Request id (primary key)
    pub id: i64,
    /// Telegram user id, duplicated for reporting queries
    pub user_id: i64,
    /// Telegram user id
    pub id_telegram: i64,
    /// Username snapshot taken when the run started
    pub tg_login: Option<String>,
    /// First name snapshot
    pub tg_firstname: Option<String>,
    /// Last name snapshot
    pub tg_lastname: Option<String>,
    /// Phone number snapshot
    pub phone: Option<String>,
    /// Owner reference
    pub root: i64,
    /// Mirror of the user's current step; -1 once completed
    pub step_number: i32,
    /// When the run started
    pub step_start: DateTime<Utc>,
    /// Last answer/navigation activity
    pub step_time: DateTime<Utc>,
}

/// A row from the `user_answers` table
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRecord {
    /// Answer id (primary key)
    pub id: i64,
    /// Telegram user id
    pub id_telegram: i64,
    /// Username at the time the answer was stored
    pub tg_login: Option<String>,
    /// The questionnaire run this answer belongs to
    pub request_id: i64,
    /// 0-based question index
    pub question_step: i32,
    /// Stored answer text
    pub answer_text: String,
    /// Either [`ANSWER_KIND_BUTTON`] or [`ANSWER_KIND_CUSTOM`]
    pub answer_type: String,
    /// Owner reference
    pub root: i64,
}

impl AnswerRecord {
    /// Whether this is a free-text answer
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.answer_type == ANSWER_KIND_CUSTOM
    }
}
