//! Questionnaire flow: phone intake, question screens, answer toggling,
//! navigation, checkpoints, interrupts and completion.
//!
//! Every mutation is written to PostgreSQL as it happens, so the in-memory
//! session can always be rebuilt from storage and an interrupted run resumes
//! exactly where it stopped.

use crate::bot::callback::{self, CallbackAction, CheckpointChoice, NavAction};
use crate::bot::state::State;
use crate::bot::{keyboard, messaging, notify, subscription};
use crate::catalog::{Catalog, Question};
use crate::config::{Settings, INACTIVITY_TIMEOUT_SECS};
use crate::db::answers::{Answers, NewAnswer};
use crate::db::models::{ANSWER_KIND_BUTTON, ANSWER_KIND_CUSTOM};
use crate::db::requests::Requests;
use crate::db::users::Users;
use crate::report;
use crate::session::{Session, SessionStore};
use anyhow::Result;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaPhoto, KeyboardRemove as ReplyKeyboardRemove};
use tokio::time::sleep;
use tracing::{error, info, warn};

const RULES_TEXT: &str = "Спасибо! Теперь ответьте, пожалуйста, на несколько вопросов \
    о будущем интерьере.\n\n\
    Как заполнять анкету:\n\
    • в каждом вопросе можно выбрать несколько вариантов ответа;\n\
    • выбранный вариант отмечается галочкой, повторное нажатие снимает выбор;\n\
    • кнопка «Свой вариант» позволяет ответить в свободной форме;\n\
    • вопросы можно листать кнопками «Предыдущий» и «Следующий»;\n\
    • прерваться можно в любой момент, прогресс сохраняется.";

const RESUME_HINT: &str =
    "Вы всегда можете продолжить заполнение технического задания, нажав /GO";

const CONGRATS_TEXT: &str = "Поздравляем, вы завершили опрос! 🎉\n\n\
    Наш дизайнер изучит ответы и свяжется с вами в ближайшее время.";

const TIMEOUT_TEXT: &str = "Опрос прерван из-за отсутствия активности, ответы сохранены.\n\n\
    Нажмите «Продолжить» или /GO, чтобы вернуться к анкете.";

const STALE_SESSION_TEXT: &str = "Сессия завершена. Нажмите /GO, чтобы продолжить.";

const CUSTOM_HINT_TEXT: &str =
    "Если вы хотите дать свой ответ, нажмите кнопку «Свой вариант» под вопросом.";

/// Entry point for /GO and the "Начать"/"Продолжить" menu buttons.
///
/// A user with an unfinished run is resumed from their persisted step with
/// all saved answers preloaded; everyone else is asked for a phone number
/// first.
pub async fn start_or_resume(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0.cast_signed();

    if !subscription::is_subscribed(&bot, &settings, user.id).await {
        return subscription::send_subscribe_prompt(
            &bot,
            msg.chat.id,
            &settings,
            subscription::REMINDER_PROMPT,
        )
        .await;
    }

    bot.send_message(msg.chat.id, "Продолжаем опрос")
        .reply_markup(ReplyKeyboardRemove::new())
        .await?;

    let record = match Users::find(&pool, user_id).await? {
        Some(record) => record,
        None => {
            Users::upsert(
                &pool,
                user_id,
                user.username.as_deref(),
                &user.first_name,
                user.last_name.as_deref(),
                settings.root_operator(),
            )
            .await?;
            return request_phone(&bot, msg.chat.id, &dialogue).await;
        }
    };
    if !record.in_progress() {
        return request_phone(&bot, msg.chat.id, &dialogue).await;
    }
    let Some(request_id) = Requests::latest_id(&pool, user_id).await? else {
        // status says "in progress" but no request row exists, start over
        return request_phone(&bot, msg.chat.id, &dialogue).await;
    };

    let start_index = catalog.clamp_index(record.resume_index());
    let mut session = Session::new(request_id, record.root, start_index);
    for row in Answers::for_request(&pool, user_id, request_id).await? {
        let step = usize::try_from(row.question_step).unwrap_or_default();
        let is_custom = row.is_custom();
        session.restore_answer(step, row.answer_text, is_custom);
    }
    info!(
        "resuming questionnaire for user {user_id} at step {} of request {request_id}",
        start_index + 1
    );
    sessions.insert(user_id, session).await;
    dialogue.update(State::Asking).await?;
    ask_question(&bot, msg.chat.id, user_id, &catalog, &sessions).await?;
    arm_inactivity_timer(bot, dialogue, user_id, sessions).await;
    Ok(())
}

async fn request_phone(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &Dialogue<State, InMemStorage<State>>,
) -> Result<()> {
    dialogue.update(State::CollectingPhone).await?;
    bot.send_message(
        chat_id,
        "Для начала заполнения анкеты поделитесь, пожалуйста, номером телефона по кнопке ниже.",
    )
    .reply_markup(keyboard::phone_request())
    .await?;
    Ok(())
}

/// Handles the contact message while collecting the phone number. Creates a
/// new questionnaire request and shows the first question.
pub async fn phone_received(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(contact) = msg.contact() else {
        bot.send_message(
            msg.chat.id,
            "Пожалуйста, нажмите на кнопку «Поделиться номером телефона».",
        )
        .reply_markup(keyboard::phone_request())
        .await?;
        return Ok(());
    };
    let user_id = user.id.0.cast_signed();

    let Some(record) = Users::find(&pool, user_id).await? else {
        dialogue.exit().await?;
        bot.send_message(
            msg.chat.id,
            "Не удалось найти вашу учетную запись. Нажмите /start и попробуйте ещё раз.",
        )
        .reply_markup(ReplyKeyboardRemove::new())
        .await?;
        return Ok(());
    };

    Users::set_phone(&pool, user_id, &contact.phone_number).await?;
    let request_id = Requests::create(
        &pool,
        user_id,
        user.username.as_deref(),
        user.first_name.as_str(),
        user.last_name.as_deref(),
        &contact.phone_number,
        settings.root_operator(),
    )
    .await?;
    info!("user {user_id} started questionnaire request {request_id}");

    bot.send_message(msg.chat.id, RULES_TEXT)
        .reply_markup(ReplyKeyboardRemove::new())
        .await?;

    sessions
        .insert(user_id, Session::new(request_id, record.root, 0))
        .await;
    dialogue.update(State::Asking).await?;
    ask_question(&bot, msg.chat.id, user_id, &catalog, &sessions).await?;
    arm_inactivity_timer(bot, dialogue, user_id, sessions).await;
    Ok(())
}

/// Sends the current question of a user's session: reference images first
/// (best effort), then the text with its inline keyboard.
pub async fn ask_question(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    catalog: &Catalog,
    sessions: &SessionStore,
) -> Result<()> {
    let Some(session) = sessions.get(user_id).await else {
        return Ok(());
    };
    let index = session.read().await.current_index;
    let Some(question) = catalog.question(index) else {
        warn!("question index {index} out of range for user {user_id}");
        return Ok(());
    };

    if question.has_images() {
        send_question_images(bot, chat_id, question, index).await;
    }

    let (selected, has_custom) = {
        let guard = session.read().await;
        (guard.selected(index).to_vec(), guard.custom(index).is_some())
    };
    let markup = keyboard::question(question, index, catalog.len(), &selected, has_custom);
    let sent = bot
        .send_message(chat_id, question.text.clone())
        .reply_markup(markup)
        .await?;
    session.write().await.prompt_message = Some(sent.id);
    Ok(())
}

/// Sends the reference images of a question as an album. Failures are
/// logged and never block the question itself.
async fn send_question_images(bot: &Bot, chat_id: ChatId, question: &Question, index: usize) {
    // Telegram albums take 2..=10 items, a lone image goes as a plain photo
    let mut urls: Vec<reqwest::Url> = question
        .image_urls()
        .filter_map(|raw| reqwest::Url::parse(raw).ok())
        .take(10)
        .collect();
    let caption = format!("Примеры к вопросу {}", index + 1);

    let outcome = match urls.len() {
        0 => return,
        1 => bot
            .send_photo(chat_id, InputFile::url(urls.remove(0)))
            .caption(caption)
            .await
            .map(|_| ()),
        _ => {
            let media: Vec<InputMedia> = urls
                .into_iter()
                .enumerate()
                .map(|(position, url)| {
                    let mut photo = InputMediaPhoto::new(InputFile::url(url));
                    if position == 0 {
                        photo = photo.caption(caption.clone());
                    }
                    InputMedia::Photo(photo)
                })
                .collect();
            bot.send_media_group(chat_id, media).await.map(|_| ())
        }
    };
    if let Err(e) = outcome {
        warn!("failed to send images for question {}: {e}", index + 1);
    }
}

/// Dispatches decoded callbacks that stay inside the questionnaire. The
/// finish and subscription callbacks have their own endpoints.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
) -> Result<()> {
    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    let Some(action) = CallbackAction::parse(&data) else {
        warn!("unknown callback payload {data:?} from user {}", q.from.id);
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };
    let user_id = q.from.id.0.cast_signed();

    if let Some(msg) = q.message.as_ref() {
        clear_hint(&bot, msg.chat().id, &sessions, user_id).await;
    }

    match action {
        CallbackAction::Answer { step, text } => {
            toggle_answer(&bot, &q, &pool, &catalog, &sessions, step, &text).await?;
        }
        CallbackAction::CustomAnswer => {
            custom_pressed(&bot, &q, &dialogue, &pool, &catalog, &sessions).await?;
        }
        CallbackAction::Nav(nav @ (NavAction::Back | NavAction::Forward | NavAction::Skip)) => {
            navigate(&bot, &q, &pool, &catalog, &sessions, nav).await?;
        }
        CallbackAction::Nav(NavAction::Interrupt)
        | CallbackAction::Checkpoint(CheckpointChoice::Defer) => {
            return interrupt(&bot, &q, &dialogue, &sessions).await;
        }
        CallbackAction::Checkpoint(CheckpointChoice::Continue) => {
            checkpoint_continue(&bot, &q, &pool, &catalog, &sessions).await?;
        }
        CallbackAction::Nav(NavAction::End) | CallbackAction::CheckSubscription => {
            return Ok(());
        }
    }

    if sessions.get(user_id).await.is_some() {
        arm_inactivity_timer(bot, dialogue, user_id, sessions).await;
    }
    Ok(())
}

async fn toggle_answer(
    bot: &Bot,
    q: &CallbackQuery,
    pool: &PgPool,
    catalog: &Catalog,
    sessions: &SessionStore,
    step: usize,
    received: &str,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        return stale_session(bot, q).await;
    };
    let Some(question) = catalog.question(step) else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    let text = callback::resolve_option_text(question, step, received);
    let kind = if question.options.iter().any(|option| option.text == text) {
        ANSWER_KIND_BUTTON
    } else {
        ANSWER_KIND_CUSTOM
    };

    let added = session.write().await.toggle(step, &text);
    let (request_id, root, current) = {
        let guard = session.read().await;
        (guard.request_id, guard.root, guard.current_index)
    };

    if added {
        Answers::insert(
            pool,
            &NewAnswer {
                id_telegram: user_id,
                tg_login: q.from.username.as_deref(),
                request_id,
                question_step: step_number(step),
                answer_text: &text,
                answer_type: kind,
                root,
            },
        )
        .await?;
    } else {
        Answers::remove(pool, user_id, request_id, step_number(step), &text).await?;
    }

    let toast = if added { "Ответ сохранён" } else { "Ответ удалён" };
    let _ = bot.answer_callback_query(q.id.clone()).text(toast).await;

    refresh_prompt(bot, q, catalog, sessions, false).await?;
    persist_step(pool, user_id, request_id, current).await?;
    Ok(())
}

/// The own-answer button toggles: with a stored custom answer it removes it,
/// otherwise it switches the dialogue into free-text entry.
async fn custom_pressed(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &Dialogue<State, InMemStorage<State>>,
    pool: &PgPool,
    catalog: &Catalog,
    sessions: &SessionStore,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        return stale_session(bot, q).await;
    };
    let index = session.read().await.current_index;
    let Some(question) = catalog.question(index) else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    let removed = session.write().await.clear_custom(index);
    if removed.is_some() {
        let request_id = session.read().await.request_id;
        Answers::remove_custom(pool, user_id, request_id, step_number(index)).await?;
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text("Ответ удалён")
            .await;
        return refresh_prompt(bot, q, catalog, sessions, false).await;
    }

    if let Some(msg) = q.message.as_ref() {
        dialogue.update(State::EnteringCustomAnswer).await?;
        messaging::delete_message_safe(bot, msg.chat().id, msg.id()).await;
        session.write().await.prompt_message = None;
        bot.send_message(
            msg.chat().id,
            format!("{}\n\nВведите ваш ответ:", question.text),
        )
        .await?;
    }
    let _ = bot.answer_callback_query(q.id.clone()).await;
    Ok(())
}

/// Handles the free-text message while a custom answer is awaited. The
/// answer replaces any earlier custom answer of the step; free-form
/// questions auto-advance afterwards.
pub async fn custom_text_received(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        dialogue.exit().await?;
        bot.send_message(msg.chat.id, STALE_SESSION_TEXT).await?;
        return Ok(());
    };
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Пожалуйста, отправьте ответ текстом.")
            .await?;
        return Ok(());
    };

    let (request_id, root, index) = {
        let guard = session.read().await;
        (guard.request_id, guard.root, guard.current_index)
    };
    session.write().await.set_custom(index, text.to_string());
    Answers::replace_custom(
        &pool,
        &NewAnswer {
            id_telegram: user_id,
            tg_login: user.username.as_deref(),
            request_id,
            question_step: step_number(index),
            answer_text: text,
            answer_type: ANSWER_KIND_CUSTOM,
            root,
        },
    )
    .await?;

    if catalog.question(index).is_some_and(Question::is_free_form) {
        session.write().await.advance(catalog.len());
    }
    let current = session.read().await.current_index;

    dialogue.update(State::Asking).await?;
    ask_question(&bot, msg.chat.id, user_id, &catalog, &sessions).await?;
    persist_step(&pool, user_id, request_id, current).await?;
    arm_inactivity_timer(bot, dialogue, user_id, sessions).await;
    Ok(())
}

async fn navigate(
    bot: &Bot,
    q: &CallbackQuery,
    pool: &PgPool,
    catalog: &Catalog,
    sessions: &SessionStore,
    action: NavAction,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        return stale_session(bot, q).await;
    };

    let moved = {
        let mut guard = session.write().await;
        match action {
            NavAction::Back => guard.retreat(),
            _ => guard.advance(catalog.len()),
        }
    };
    let (request_id, current) = {
        let guard = session.read().await;
        (guard.request_id, guard.current_index)
    };

    refresh_prompt(bot, q, catalog, sessions, moved).await?;
    persist_step(pool, user_id, request_id, current).await?;
    let _ = bot.answer_callback_query(q.id.clone()).await;
    Ok(())
}

async fn checkpoint_continue(
    bot: &Bot,
    q: &CallbackQuery,
    pool: &PgPool,
    catalog: &Catalog,
    sessions: &SessionStore,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        return stale_session(bot, q).await;
    };

    session.write().await.advance(catalog.len());
    let (request_id, current) = {
        let guard = session.read().await;
        (guard.request_id, guard.current_index)
    };

    if let Some(msg) = q.message.as_ref() {
        messaging::delete_message_safe(bot, msg.chat().id, msg.id()).await;
        ask_question(bot, msg.chat().id, user_id, catalog, sessions).await?;
    }
    persist_step(pool, user_id, request_id, current).await?;
    let _ = bot
        .answer_callback_query(q.id.clone())
        .text("Продолжаем опрос!")
        .await;
    Ok(())
}

async fn interrupt(
    bot: &Bot,
    q: &CallbackQuery,
    dialogue: &Dialogue<State, InMemStorage<State>>,
    sessions: &SessionStore,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    sessions.remove(user_id).await;
    dialogue.exit().await?;
    info!("user {user_id} interrupted the questionnaire");

    if let Some(msg) = q.message.as_ref() {
        messaging::delete_message_safe(bot, msg.chat().id, msg.id()).await;
        bot.send_message(msg.chat().id, RESUME_HINT)
            .reply_markup(keyboard::resume_menu())
            .await?;
    }
    let _ = bot.answer_callback_query(q.id.clone()).await;
    Ok(())
}

/// Endpoint for the finish button on the last question. Persists the
/// terminal markers, thanks the user and delivers the report to every
/// operator.
pub async fn finish(
    bot: Bot,
    q: CallbackQuery,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<()> {
    let user_id = q.from.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        return stale_session(&bot, &q).await;
    };
    let request_id = session.read().await.request_id;

    if let Some(msg) = q.message.as_ref() {
        messaging::edit_reply_markup_safe(&bot, msg.chat().id, msg.id(), None).await;
        bot.send_message(msg.chat().id, CONGRATS_TEXT)
            .reply_markup(ReplyKeyboardRemove::new())
            .await?;
    }

    Users::finish(&pool, user_id).await?;
    Requests::finish(&pool, request_id).await?;
    sessions.remove(user_id).await;
    dialogue.exit().await?;
    let _ = bot.answer_callback_query(q.id.clone()).await;
    info!("user {user_id} finished questionnaire request {request_id}");

    match report::generate(
        &pool,
        &catalog,
        Path::new(&settings.reports_dir),
        user_id,
        request_id,
    )
    .await
    {
        Ok(path) => notify::send_report_to_operators(&bot, &settings, &q.from, &path).await,
        Err(e) => error!("report generation failed for user {user_id}: {e:#}"),
    }
    Ok(())
}

/// Handles plain text sent while a question screen is open. The menu labels
/// re-enter the questionnaire exactly like /GO; any other message is removed
/// and the user is pointed at the own-answer button.
pub async fn stray_text(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<()> {
    let resume_label = matches!(
        msg.text().map(str::trim),
        Some(keyboard::START_BUTTON | keyboard::RESUME_BUTTON)
    );
    if resume_label {
        return start_or_resume(bot, msg, dialogue, pool, catalog, sessions, settings).await;
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        dialogue.exit().await?;
        bot.send_message(msg.chat.id, STALE_SESSION_TEXT).await?;
        return Ok(());
    };

    messaging::delete_message_safe(&bot, msg.chat.id, msg.id).await;
    let previous = session.write().await.hint_message.take();
    if let Some(hint_id) = previous {
        messaging::delete_message_safe(&bot, msg.chat.id, hint_id).await;
    }
    let hint = bot.send_message(msg.chat.id, CUSTOM_HINT_TEXT).await?;
    session.write().await.hint_message = Some(hint.id);
    arm_inactivity_timer(bot, dialogue, user_id, sessions).await;
    Ok(())
}

/// Redraws the question attached to a callback. With `moved` set the old
/// screen is replaced by a fresh one (images may differ between steps);
/// otherwise only the markup of the existing message is updated.
async fn refresh_prompt(
    bot: &Bot,
    q: &CallbackQuery,
    catalog: &Catalog,
    sessions: &SessionStore,
    moved: bool,
) -> Result<()> {
    let Some(msg) = q.message.as_ref() else {
        return Ok(());
    };
    let user_id = q.from.id.0.cast_signed();
    let Some(session) = sessions.get(user_id).await else {
        return Ok(());
    };
    let index = session.read().await.current_index;
    let Some(question) = catalog.question(index) else {
        return Ok(());
    };

    if moved {
        messaging::delete_message_safe(bot, msg.chat().id, msg.id()).await;
        ask_question(bot, msg.chat().id, user_id, catalog, sessions).await?;
        return Ok(());
    }

    let (selected, has_custom) = {
        let guard = session.read().await;
        (guard.selected(index).to_vec(), guard.custom(index).is_some())
    };
    let markup = keyboard::question(question, index, catalog.len(), &selected, has_custom);
    messaging::edit_message_safe(bot, msg.chat().id, msg.id(), &question.text, Some(markup)).await;
    session.write().await.prompt_message = Some(msg.id());
    Ok(())
}

async fn persist_step(pool: &PgPool, user_id: i64, request_id: i64, index: usize) -> Result<()> {
    Users::set_step(pool, user_id, step_number(index) + 1).await?;
    Requests::set_step(pool, request_id, step_number(index) + 1).await?;
    Ok(())
}

async fn clear_hint(bot: &Bot, chat_id: ChatId, sessions: &SessionStore, user_id: i64) {
    if let Some(session) = sessions.get(user_id).await {
        let hint = session.write().await.hint_message.take();
        if let Some(hint_id) = hint {
            messaging::delete_message_safe(bot, chat_id, hint_id).await;
        }
    }
}

async fn stale_session(bot: &Bot, q: &CallbackQuery) -> Result<()> {
    let _ = bot
        .answer_callback_query(q.id.clone())
        .text(STALE_SESSION_TEXT)
        .await;
    Ok(())
}

fn step_number(step: usize) -> i32 {
    i32::try_from(step).unwrap_or_default()
}

/// Arms (or rearms) the inactivity timer of a session. The previous timer
/// task is cancelled through its token, so at most one timer is live per
/// user at any moment.
pub async fn arm_inactivity_timer(
    bot: Bot,
    dialogue: Dialogue<State, InMemStorage<State>>,
    user_id: i64,
    sessions: Arc<SessionStore>,
) {
    let token = sessions.rearm_timer(user_id).await;
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            () = sleep(Duration::from_secs(INACTIVITY_TIMEOUT_SECS)) => {
                expire_session(bot, dialogue, user_id, sessions).await;
            }
        }
    });
}

async fn expire_session(
    bot: Bot,
    dialogue: Dialogue<State, InMemStorage<State>>,
    user_id: i64,
    sessions: Arc<SessionStore>,
) {
    let Some(session) = sessions.remove(user_id).await else {
        return;
    };
    info!("questionnaire session of user {user_id} expired after {INACTIVITY_TIMEOUT_SECS}s");

    let (prompt, hint) = {
        let guard = session.read().await;
        (guard.prompt_message, guard.hint_message)
    };
    let chat_id = ChatId(user_id);
    if let Some(message_id) = prompt {
        messaging::delete_message_safe(&bot, chat_id, message_id).await;
    }
    if let Some(message_id) = hint {
        messaging::delete_message_safe(&bot, chat_id, message_id).await;
    }
    if let Err(e) = dialogue.exit().await {
        warn!("failed to reset dialogue of user {user_id}: {e}");
    }
    if let Err(e) = bot
        .send_message(chat_id, TIMEOUT_TEXT)
        .reply_markup(keyboard::resume_menu())
        .await
    {
        warn!("failed to notify user {user_id} about expiry: {e}");
    }
}
