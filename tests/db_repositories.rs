//! Repository integration tests against a real PostgreSQL instance.
//!
//! Run with `DATABASE_URL` pointing at a scratch database:
//! `cargo test -- --ignored`

use anyhow::Result;
use brief_bot::db::answers::{Answers, NewAnswer};
use brief_bot::db::models::{ANSWER_KIND_BUTTON, ANSWER_KIND_CUSTOM};
use brief_bot::db::requests::Requests;
use brief_bot::db::users::Users;
use brief_bot::db;
use sqlx::PgPool;
use std::time::Duration;

async fn connect() -> Result<PgPool> {
    let url = std::env::var("DATABASE_URL")?;
    let pool = db::create_pool(&url).await?;
    db::run_migrations(&pool).await?;
    Ok(pool)
}

fn unique_user_id() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL"]
async fn test_full_persistence_cycle() -> Result<()> {
    let pool = connect().await?;
    let user_id = unique_user_id();

    Users::upsert(&pool, user_id, Some("itest"), "Интеграционный", None, 1).await?;
    // registration is first-write-wins
    Users::upsert(&pool, user_id, Some("changed"), "Другой", None, 1).await?;
    let record = Users::find(&pool, user_id).await?.expect("user row");
    assert_eq!(record.tg_login.as_deref(), Some("itest"));
    assert!(!record.in_progress());

    Users::set_phone(&pool, user_id, "+79990000000").await?;
    let request_id = Requests::create(
        &pool,
        user_id,
        Some("itest"),
        "Интеграционный",
        None,
        "+79990000000",
        1,
    )
    .await?;
    assert_eq!(Requests::latest_id(&pool, user_id).await?, Some(request_id));
    let started = Users::find(&pool, user_id).await?.expect("user row");
    assert!(started.in_progress());

    // toggling the same option twice keeps a single row
    let answer = NewAnswer {
        id_telegram: user_id,
        tg_login: Some("itest"),
        request_id,
        question_step: 0,
        answer_text: "Лофт",
        answer_type: ANSWER_KIND_BUTTON,
        root: 1,
    };
    Answers::insert(&pool, &answer).await?;
    Answers::insert(&pool, &answer).await?;
    assert_eq!(Answers::for_request(&pool, user_id, request_id).await?.len(), 1);

    Answers::remove(&pool, user_id, request_id, 0, "Лофт").await?;
    assert!(Answers::for_request(&pool, user_id, request_id)
        .await?
        .is_empty());

    // a re-entered custom answer replaces the previous one
    let custom = NewAnswer {
        answer_text: "первый вариант",
        answer_type: ANSWER_KIND_CUSTOM,
        ..answer.clone()
    };
    Answers::replace_custom(&pool, &custom).await?;
    let updated = NewAnswer {
        answer_text: "второй вариант",
        ..custom.clone()
    };
    Answers::replace_custom(&pool, &updated).await?;
    let rows = Answers::for_request(&pool, user_id, request_id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].answer_text, "второй вариант");
    assert!(rows[0].is_custom());

    Answers::remove_custom(&pool, user_id, request_id, 0).await?;
    assert!(Answers::for_request(&pool, user_id, request_id)
        .await?
        .is_empty());

    // step bookkeeping drives the resume point
    Users::set_step(&pool, user_id, 3).await?;
    Requests::set_step(&pool, request_id, 3).await?;
    let resumed = Users::find(&pool, user_id).await?.expect("user row");
    assert_eq!(resumed.resume_index(), 2);

    Users::finish(&pool, user_id).await?;
    Requests::finish(&pool, request_id).await?;
    let finished = Users::find(&pool, user_id).await?.expect("user row");
    assert!(!finished.in_progress());
    assert_eq!(finished.last_step, 0);
    let request = Requests::find(&pool, user_id, request_id)
        .await?
        .expect("request row");
    assert_eq!(request.step_number, -1);

    Ok(())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL"]
async fn test_custom_text_equal_to_selected_option_keeps_the_button_row() -> Result<()> {
    let pool = connect().await?;
    let user_id = unique_user_id();

    Users::upsert(&pool, user_id, Some("echo"), "Совпадение", None, 1).await?;
    Users::set_phone(&pool, user_id, "+79997778899").await?;
    let request_id = Requests::create(
        &pool,
        user_id,
        Some("echo"),
        "Совпадение",
        None,
        "+79997778899",
        1,
    )
    .await?;

    let button = NewAnswer {
        id_telegram: user_id,
        tg_login: Some("echo"),
        request_id,
        question_step: 2,
        answer_text: "Сканди",
        answer_type: ANSWER_KIND_BUTTON,
        root: 1,
    };
    Answers::insert(&pool, &button).await?;

    // answers are keyed by text alone, so typing the same text as a custom
    // answer does not duplicate the row and the earlier kind wins
    let echoed = NewAnswer {
        answer_type: ANSWER_KIND_CUSTOM,
        ..button.clone()
    };
    Answers::replace_custom(&pool, &echoed).await?;
    let rows = Answers::for_request(&pool, user_id, request_id).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].answer_text, "Сканди");
    assert!(!rows[0].is_custom());

    // the button row survives remove_custom, it was never custom-typed
    Answers::remove_custom(&pool, user_id, request_id, 2).await?;
    assert_eq!(Answers::for_request(&pool, user_id, request_id).await?.len(), 1);

    // a different text still lands as the single custom row of the step
    let distinct = NewAnswer {
        answer_text: "скандинавский, но теплее",
        ..echoed.clone()
    };
    Answers::replace_custom(&pool, &distinct).await?;
    let rows = Answers::for_request(&pool, user_id, request_id).await?;
    assert_eq!(rows.len(), 2);
    assert!(rows
        .iter()
        .any(|row| row.answer_text == "Сканди" && !row.is_custom()));
    assert!(rows
        .iter()
        .any(|row| row.answer_text == "скандинавский, но теплее" && row.is_custom()));

    Ok(())
}

#[tokio::test]
#[ignore = "requires a live PostgreSQL"]
async fn test_reset_retains_history_and_new_run_supersedes() -> Result<()> {
    let pool = connect().await?;
    let user_id = unique_user_id();

    Users::upsert(&pool, user_id, Some("resetter"), "Сброс", None, 1).await?;
    Users::set_phone(&pool, user_id, "+79991112233").await?;
    let first_run = Requests::create(
        &pool,
        user_id,
        Some("resetter"),
        "Сброс",
        None,
        "+79991112233",
        1,
    )
    .await?;
    Answers::insert(
        &pool,
        &NewAnswer {
            id_telegram: user_id,
            tg_login: Some("resetter"),
            request_id: first_run,
            question_step: 1,
            answer_text: "До 40 м²",
            answer_type: ANSWER_KIND_BUTTON,
            root: 1,
        },
    )
    .await?;

    Users::reset(&pool, user_id).await?;
    let record = Users::find(&pool, user_id).await?.expect("user row");
    assert!(!record.in_progress());
    assert_eq!(record.last_step, 0);
    assert!(record.phone.is_none());

    // history survives the reset
    assert_eq!(Answers::for_request(&pool, user_id, first_run).await?.len(), 1);
    assert_eq!(Requests::latest_id(&pool, user_id).await?, Some(first_run));

    // a later run becomes the current one without touching the old rows
    tokio::time::sleep(Duration::from_millis(50)).await;
    Users::set_phone(&pool, user_id, "+79994445566").await?;
    let second_run = Requests::create(
        &pool,
        user_id,
        Some("resetter"),
        "Сброс",
        None,
        "+79994445566",
        1,
    )
    .await?;
    assert_eq!(Requests::latest_id(&pool, user_id).await?, Some(second_run));
    assert_eq!(Answers::for_request(&pool, user_id, first_run).await?.len(), 1);
    assert!(Answers::for_request(&pool, user_id, second_run)
        .await?
        .is_empty());

    Ok(())
}
