//! Repository for the `data_questions` table

use sqlx::PgPool;

use super::models::RequestRecord;

/// Column list for data_questions queries.
const REQUEST_COLUMNS: &str = "id, user_id, id_telegram, tg_login, tg_firstname, tg_lastname, \
    phone, root, step_number, step_start, step_time";

/// Provides CRUD operations for questionnaire runs.
pub struct Requests;

impl Requests {
    /// Open a new questionnaire run with a snapshot of the user's contact
    /// data, returning the new request id.
    pub async fn create(
        pool: &PgPool,
        id_telegram: i64,
        login: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        phone: &str,
        root: i64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO data_questions
                (user_id, id_telegram, tg_login, tg_firstname, tg_lastname, phone, root)
             VALUES ($1, $1, $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(id_telegram)
        .bind(login)
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .bind(root)
        .fetch_one(pool)
        .await
    }

    /// Id of the user's current (most recently started) run, if any.
    pub async fn latest_id(pool: &PgPool, id_telegram: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM data_questions
             WHERE id_telegram = $1
             ORDER BY step_start DESC
             LIMIT 1",
        )
        .bind(id_telegram)
        .fetch_optional(pool)
        .await
    }

    /// Load a specific run of a user.
    pub async fn find(
        pool: &PgPool,
        id_telegram: i64,
        request_id: i64,
    ) -> Result<Option<RequestRecord>, sqlx::Error> {
        let query =
            format!("SELECT {REQUEST_COLUMNS} FROM data_questions WHERE id_telegram = $1 AND id = $2");
        sqlx::query_as::<_, RequestRecord>(&query)
            .bind(id_telegram)
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// Mirror the user's current step onto the run and refresh its activity
    /// timestamp.
    pub async fn set_step(
        pool: &PgPool,
        request_id: i64,
        step_number: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE data_questions SET step_number = $1, step_time = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(step_number)
        .bind(request_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark the run as completed.
    pub async fn finish(pool: &PgPool, request_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE data_questions SET step_number = -1, step_time = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(request_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
