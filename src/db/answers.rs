//! Repository for the `user_answers` table

use sqlx::PgPool;

use super::models::{AnswerRecord, ANSWER_KIND_CUSTOM};

/// Column list for user_answers queries.
const ANSWER_COLUMNS: &str =
    "id, id_telegram, tg_login, request_id, question_step, answer_text, answer_type, root";

/// Payload for storing one answer.
#[derive(Debug, Clone)]
pub struct NewAnswer<'a> {
    /// Telegram user id
    pub id_telegram: i64,
    /// Username at the time of answering
    pub tg_login: Option<&'a str>,
    /// The questionnaire run the answer belongs to
    pub request_id: i64,
    /// 0-based question index
    pub question_step: i32,
    /// Answer text
    pub answer_text: &'a str,
    /// `button` or `custom`
    pub answer_type: &'a str,
    /// Owner reference
    pub root: i64,
}

/// Provides CRUD operations for stored answers.
pub struct Answers;

impl Answers {
    /// Store a toggled option. The unique index on
    /// (id_telegram, request_id, question_step, answer_text) makes repeats
    /// a no-op, so toggling stays idempotent.
    pub async fn insert(pool: &PgPool, answer: &NewAnswer<'_>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_answers
                (id_telegram, tg_login, request_id, question_step, answer_text, answer_type, root)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id_telegram, request_id, question_step, answer_text) DO NOTHING",
        )
        .bind(answer.id_telegram)
        .bind(answer.tg_login)
        .bind(answer.request_id)
        .bind(answer.question_step)
        .bind(answer.answer_text)
        .bind(answer.answer_type)
        .bind(answer.root)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove a toggled-off option.
    pub async fn remove(
        pool: &PgPool,
        id_telegram: i64,
        request_id: i64,
        question_step: i32,
        answer_text: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM user_answers
             WHERE id_telegram = $1 AND request_id = $2 AND question_step = $3 AND answer_text = $4",
        )
        .bind(id_telegram)
        .bind(request_id)
        .bind(question_step)
        .bind(answer_text)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Store a free-text answer, replacing any previous one on the step so
    /// at most one custom row exists per (user, run, step). Answers are
    /// keyed by text, so a custom entry matching an already-selected option
    /// leaves the existing button row as is.
    pub async fn replace_custom(pool: &PgPool, answer: &NewAnswer<'_>) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query(
            "DELETE FROM user_answers
             WHERE id_telegram = $1 AND request_id = $2 AND question_step = $3 AND answer_type = $4",
        )
        .bind(answer.id_telegram)
        .bind(answer.request_id)
        .bind(answer.question_step)
        .bind(ANSWER_KIND_CUSTOM)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO user_answers
                (id_telegram, tg_login, request_id, question_step, answer_text, answer_type, root)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id_telegram, request_id, question_step, answer_text) DO NOTHING",
        )
        .bind(answer.id_telegram)
        .bind(answer.tg_login)
        .bind(answer.request_id)
        .bind(answer.question_step)
        .bind(answer.answer_text)
        .bind(answer.answer_type)
        .bind(answer.root)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Remove the free-text answer of a step.
    pub async fn remove_custom(
        pool: &PgPool,
        id_telegram: i64,
        request_id: i64,
        question_step: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "DELETE FROM user_answers
             WHERE id_telegram = $1 AND request_id = $2 AND question_step = $3 AND answer_type = $4",
        )
        .bind(id_telegram)
        .bind(request_id)
        .bind(question_step)
        .bind(ANSWER_KIND_CUSTOM)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// All answers of a run, ordered by question step.
    pub async fn for_request(
        pool: &PgPool,
        id_telegram: i64,
        request_id: i64,
    ) -> Result<Vec<AnswerRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {ANSWER_COLUMNS} FROM user_answers
             WHERE id_telegram = $1 AND request_id = $2
             ORDER BY question_step ASC, id ASC"
        );
        sqlx::query_as::<_, AnswerRecord>(&query)
            .bind(id_telegram)
            .bind(request_id)
            .fetch_all(pool)
            .await
    }
}
