//! Channel subscription gate.
//!
//! Every user-facing surface checks membership in the configured channel
//! before doing anything else. A Bot API failure counts as "not subscribed"
//! so the gate stays closed when Telegram is unreachable.

use crate::bot::keyboard;
use crate::config::Settings;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::warn;

/// Gate text shown on /start.
pub const START_PROMPT: &str = "Добро пожаловать! 👋\n\n\
    Для работы с ботом необходимо подписаться на наш канал.\n\
    После подписки нажмите «Проверить подписку».";

/// Gate text shown on every other surface.
pub const REMINDER_PROMPT: &str = "Для продолжения работы необходимо подписаться на наш канал.\n\
    После подписки нажмите «Проверить подписку».";

/// Alert shown when the re-check still finds no membership.
pub const NOT_SUBSCRIBED_ALERT: &str = "Вы ещё не подписаны на канал.\n\n\
    Подпишитесь и нажмите «Проверить подписку» ещё раз.";

/// Toast shown when the re-check succeeds.
pub const THANKS_TEXT: &str = "Спасибо за подписку! ✅";

/// Returns whether the user is an owner, administrator or member of the
/// configured channel.
pub async fn is_subscribed(bot: &Bot, settings: &Settings, user_id: UserId) -> bool {
    match bot
        .get_chat_member(settings.channel_recipient(), user_id)
        .await
    {
        Ok(member) => {
            member.kind.is_owner() || member.kind.is_administrator() || member.kind.is_member()
        }
        Err(e) => {
            warn!("subscription check failed for user {user_id}: {e}");
            false
        }
    }
}

/// Sends a gate prompt with the subscribe/re-check keyboard.
pub async fn send_subscribe_prompt(
    bot: &Bot,
    chat_id: ChatId,
    settings: &Settings,
    text: &str,
) -> Result<()> {
    bot.send_message(chat_id, text)
        .reply_markup(keyboard::subscribe(settings))
        .await?;
    Ok(())
}
