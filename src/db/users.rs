//! Repository for the `users_designer` table

use sqlx::PgPool;

use super::models::UserRecord;

/// Column list for users_designer queries.
const USER_COLUMNS: &str =
    "id_telegram, tg_login, tg_firstname, tg_lastname, status, phone, last_step, subscribe, root";

/// Provides CRUD operations for bot users.
pub struct Users;

impl Users {
    /// Register a user on first contact; existing rows are left untouched.
    pub async fn upsert(
        pool: &PgPool,
        id_telegram: i64,
        login: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        root: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users_designer
                (id_telegram, tg_login, tg_firstname, tg_lastname, status, phone, last_step, subscribe, root)
             VALUES ($1, $2, $3, $4, 0, NULL, 0, 0, $5)
             ON CONFLICT (id_telegram) DO NOTHING",
        )
        .bind(id_telegram)
        .bind(login)
        .bind(first_name)
        .bind(last_name)
        .bind(root)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a user by Telegram id.
    pub async fn find(pool: &PgPool, id_telegram: i64) -> Result<Option<UserRecord>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users_designer WHERE id_telegram = $1");
        sqlx::query_as::<_, UserRecord>(&query)
            .bind(id_telegram)
            .fetch_optional(pool)
            .await
    }

    /// Store the confirmed phone number and mark the questionnaire as started.
    pub async fn set_phone(pool: &PgPool, id_telegram: i64, phone: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users_designer SET phone = $1, status = 1 WHERE id_telegram = $2")
            .bind(phone)
            .bind(id_telegram)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Persist the 1-based number of the question currently shown.
    pub async fn set_step(pool: &PgPool, id_telegram: i64, last_step: i32) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users_designer SET last_step = $1 WHERE id_telegram = $2")
            .bind(last_step)
            .bind(id_telegram)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark the questionnaire as completed.
    pub async fn finish(pool: &PgPool, id_telegram: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users_designer SET status = 0, last_step = 0 WHERE id_telegram = $1")
            .bind(id_telegram)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Clear the questionnaire progress and the stored phone number. The
    /// user's requests and answers are retained; a later run supersedes them
    /// with a fresh request.
    pub async fn reset(pool: &PgPool, id_telegram: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users_designer SET status = 0, last_step = 0, phone = NULL WHERE id_telegram = $1",
        )
        .bind(id_telegram)
        .execute(pool)
        .await?;
        Ok(())
    }
}
