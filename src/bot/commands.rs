//! Command and menu-button handlers.

use crate::bot::state::State;
use crate::bot::{keyboard, messaging, questionnaire, subscription};
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::db::requests::Requests;
use crate::db::users::Users;
use crate::report;
use crate::session::SessionStore;
use anyhow::Result;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

/// Commands understood by the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Доступные команды:")]
pub enum Command {
    /// Greet the user and show the main menu
    #[command(description = "начать работу с ботом.")]
    Start,
    /// Start or resume the questionnaire
    #[command(rename = "GO", description = "заполнить анкету или продолжить с сохранённого места.")]
    Go,
    /// Show the main menu keyboard
    #[command(description = "главное меню.")]
    Menu,
    /// Wipe questionnaire progress
    #[command(description = "сбросить прогресс анкеты.")]
    Reset,
    /// Usage help
    #[command(description = "справка по боту.")]
    Help,
    /// Studio contact details
    #[command(description = "контакты студии.")]
    Contacts,
    /// Operator-only: build a report for an arbitrary user
    #[command(description = "сформировать документ по ID пользователя.")]
    Manual,
}

const WELCOME_TEXT: &str = "Здравствуйте! 👋\n\n\
    Я помогу составить техническое задание на дизайн вашего интерьера: задам \
    несколько вопросов о помещении, стиле и бюджете, а ответы передам дизайнеру.\n\n\
    Нажмите «Начать», чтобы перейти к анкете, или «Хелпер», чтобы узнать подробности.";

const MENU_TEXT: &str = "Выберите необходимый пункт меню.";

const HELP_TEXT: &str = "ℹ️ Как работает бот:\n\n\
    1. Нажмите «Начать» или отправьте /GO.\n\
    2. Поделитесь номером телефона, чтобы дизайнер мог с вами связаться.\n\
    3. Ответьте на вопросы анкеты: в каждом вопросе можно выбрать несколько \
    вариантов или дать свой ответ кнопкой «Свой вариант».\n\
    4. Готовую анкету получит дизайнер и свяжется с вами.\n\n\
    Анкету можно прервать в любой момент, прогресс сохраняется.\n\n\
    Команды:\n\
    /GO — заполнить анкету или продолжить\n\
    /menu — главное меню\n\
    /reset — сбросить прогресс\n\
    /contacts — контакты студии\n\
    /help — эта справка";

const CONTACTS_TEXT: &str = "📍 Студия интерьерного дизайна\n\n\
    Телефон: +7 (900) 000-00-00\n\
    Почта: hello@studio.design\n\
    Сайт: https://studio.design\n\n\
    Будем рады обсудить ваш проект!";

/// /start: register the user and show the main menu, gated on the channel
/// subscription.
pub async fn start(bot: Bot, msg: Message, pool: PgPool, settings: Arc<Settings>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !subscription::is_subscribed(&bot, &settings, user.id).await {
        info!("user {} gated on /start until subscribed", user.id);
        return subscription::send_subscribe_prompt(
            &bot,
            msg.chat.id,
            &settings,
            subscription::START_PROMPT,
        )
        .await;
    }
    let user_id = user.id.0.cast_signed();
    Users::upsert(
        &pool,
        user_id,
        user.username.as_deref(),
        &user.first_name,
        user.last_name.as_deref(),
        settings.root_operator(),
    )
    .await?;
    send_welcome(&bot, msg.chat.id, &pool, user_id).await
}

/// /menu and the "Меню" button.
pub async fn menu(bot: Bot, msg: Message, pool: PgPool, settings: Arc<Settings>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !subscription::is_subscribed(&bot, &settings, user.id).await {
        return subscription::send_subscribe_prompt(
            &bot,
            msg.chat.id,
            &settings,
            subscription::REMINDER_PROMPT,
        )
        .await;
    }
    let last_step = Users::find(&pool, user.id.0.cast_signed())
        .await?
        .map_or(0, |record| record.last_step);
    bot.send_message(msg.chat.id, MENU_TEXT)
        .reply_markup(keyboard::main_menu(last_step))
        .await?;
    Ok(())
}

/// /reset: drop the live session and clear persisted progress. Stored
/// requests and answers stay on file for the operators.
pub async fn reset(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !subscription::is_subscribed(&bot, &settings, user.id).await {
        return subscription::send_subscribe_prompt(
            &bot,
            msg.chat.id,
            &settings,
            subscription::REMINDER_PROMPT,
        )
        .await;
    }
    let user_id = user.id.0.cast_signed();
    sessions.remove(user_id).await;
    dialogue.exit().await?;
    Users::reset(&pool, user_id).await?;
    info!("user {user_id} reset questionnaire progress");
    bot.send_message(
        msg.chat.id,
        "Прогресс анкеты сброшен. Нажмите «Начать» или /GO, чтобы заполнить её заново.",
    )
    .reply_markup(keyboard::restart_menu())
    .await?;
    Ok(())
}

/// /help and the "Хелпер" button. Not gated, anyone may read the manual.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, HELP_TEXT).await?;
    Ok(())
}

/// /contacts and the "Контакты" button.
pub async fn contacts(bot: Bot, msg: Message, settings: Arc<Settings>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !subscription::is_subscribed(&bot, &settings, user.id).await {
        return subscription::send_subscribe_prompt(
            &bot,
            msg.chat.id,
            &settings,
            subscription::REMINDER_PROMPT,
        )
        .await;
    }
    bot.send_message(msg.chat.id, CONTACTS_TEXT).await?;
    Ok(())
}

/// /manual: operator entry point, asks for the target user id.
pub async fn manual(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !settings.is_operator(user.id.0.cast_signed()) {
        bot.send_message(msg.chat.id, "У вас нет доступа к этой команде.")
            .await?;
        return Ok(());
    }
    dialogue.update(State::AwaitingTargetUser).await?;
    bot.send_message(
        msg.chat.id,
        "Введите ID пользователя, для которого нужно сформировать документ:",
    )
    .await?;
    Ok(())
}

/// Handles the target-id message after /manual. The state is kept on
/// invalid input so the operator can correct the id.
pub async fn manual_target(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    settings: Arc<Settings>,
) -> Result<()> {
    let trimmed = msg.text().unwrap_or_default().trim().to_string();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        bot.send_message(
            msg.chat.id,
            "Пожалуйста, введите корректный ID пользователя (число).",
        )
        .await?;
        return Ok(());
    }
    let Ok(target) = trimmed.parse::<i64>() else {
        bot.send_message(
            msg.chat.id,
            "Пожалуйста, введите корректный ID пользователя (число).",
        )
        .await?;
        return Ok(());
    };

    if Users::find(&pool, target).await?.is_none() {
        dialogue.exit().await?;
        bot.send_message(msg.chat.id, "Пользователь не найден.")
            .await?;
        return Ok(());
    }
    let Some(request_id) = Requests::latest_id(&pool, target).await? else {
        dialogue.exit().await?;
        bot.send_message(
            msg.chat.id,
            "Для этого пользователя нет сохранённых ответов.",
        )
        .await?;
        return Ok(());
    };

    match report::generate(
        &pool,
        &catalog,
        Path::new(&settings.reports_dir),
        target,
        request_id,
    )
    .await
    {
        Ok(path) => {
            info!("manual report for user {target} generated at {}", path.display());
            bot.send_message(msg.chat.id, "Документ успешно сформирован:")
                .await?;
            bot.send_document(msg.chat.id, InputFile::file(path)).await?;
        }
        Err(e) => {
            error!("manual report generation for user {target} failed: {e:#}");
            bot.send_message(
                msg.chat.id,
                "Не удалось сформировать документ, попробуйте позже.",
            )
            .await?;
        }
    }
    dialogue.exit().await?;
    Ok(())
}

/// Dispatches menu-button texts received outside the questionnaire.
pub async fn idle_text(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let trimmed = text.trim();
    match trimmed {
        keyboard::START_BUTTON | keyboard::RESUME_BUTTON => {
            return questionnaire::start_or_resume(
                bot, msg, dialogue, pool, catalog, sessions, settings,
            )
            .await;
        }
        "Контакты" => return contacts(bot, msg, settings).await,
        _ => {}
    }
    match trimmed.to_lowercase().as_str() {
        "меню" => menu(bot, msg, pool, settings).await,
        "хелпер" => help(bot, msg).await,
        _ => Ok(()),
    }
}

/// Handles the "Проверить подписку" callback: repeats the membership check
/// and unlocks the main menu on success.
pub async fn confirm_subscription(
    bot: Bot,
    q: CallbackQuery,
    pool: PgPool,
    settings: Arc<Settings>,
) -> Result<()> {
    let user = &q.from;
    let user_id = user.id.0.cast_signed();
    let chat_id = q
        .message
        .as_ref()
        .map_or(ChatId(user_id), |msg| msg.chat().id);

    if !subscription::is_subscribed(&bot, &settings, user.id).await {
        let _ = bot
            .answer_callback_query(q.id.clone())
            .text(subscription::NOT_SUBSCRIBED_ALERT)
            .show_alert(true)
            .await;
        return Ok(());
    }

    if let Some(msg) = q.message.as_ref() {
        messaging::delete_message_safe(&bot, msg.chat().id, msg.id()).await;
    }
    Users::upsert(
        &pool,
        user_id,
        user.username.as_deref(),
        &user.first_name,
        user.last_name.as_deref(),
        settings.root_operator(),
    )
    .await?;
    let _ = bot
        .answer_callback_query(q.id.clone())
        .text(subscription::THANKS_TEXT)
        .await;
    info!("user {user_id} confirmed channel subscription");
    send_welcome(&bot, chat_id, &pool, user_id).await
}

async fn send_welcome(bot: &Bot, chat_id: ChatId, pool: &PgPool, user_id: i64) -> Result<()> {
    let last_step = Users::find(pool, user_id)
        .await?
        .map_or(0, |record| record.last_step);
    bot.send_message(chat_id, WELCOME_TEXT)
        .reply_markup(keyboard::main_menu(last_step))
        .await?;
    Ok(())
}
