//! Common messaging utilities for the Telegram bot.
//!
//! Questionnaire screens are edited and deleted aggressively, so a handful
//! of Bot API errors are expected in normal operation: double taps produce
//! "message is not modified", expired screens produce "message to edit not
//! found". These helpers swallow that class of errors and log everything
//! else, without retrying.

use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId};
use tracing::{debug, warn};

/// Error substrings the Bot API returns for edits and deletes that are
/// already satisfied or no longer possible.
const BENIGN_ERRORS: [&str; 4] = [
    "message is not modified",
    "message to edit not found",
    "message to delete not found",
    "message can't be deleted",
];

fn is_benign(error: &str) -> bool {
    BENIGN_ERRORS.iter().any(|marker| error.contains(marker))
}

fn log_api_error(op: &str, chat_id: ChatId, message_id: MessageId, error: &str) {
    if is_benign(error) {
        debug!("{op} in chat {chat_id} for message {message_id}: {error}");
    } else {
        warn!("{op} failed in chat {chat_id} for message {message_id}: {error}");
    }
}

/// Edits message text and markup in place. Returns `false` if the edit did
/// not go through; the error is logged and never propagated.
pub async fn edit_message_safe(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    text: &str,
    markup: Option<InlineKeyboardMarkup>,
) -> bool {
    let mut request = bot.edit_message_text(chat_id, message_id, text);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    match request.await {
        Ok(_) => true,
        Err(e) => {
            log_api_error("edit", chat_id, message_id, &e.to_string());
            false
        }
    }
}

/// Replaces (or strips, when `markup` is `None`) the inline keyboard of a
/// sent message.
pub async fn edit_reply_markup_safe(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    markup: Option<InlineKeyboardMarkup>,
) -> bool {
    let mut request = bot.edit_message_reply_markup(chat_id, message_id);
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    match request.await {
        Ok(_) => true,
        Err(e) => {
            log_api_error("markup edit", chat_id, message_id, &e.to_string());
            false
        }
    }
}

/// Deletes a message, tolerating ones that are already gone.
pub async fn delete_message_safe(bot: &Bot, chat_id: ChatId, message_id: MessageId) -> bool {
    match bot.delete_message(chat_id, message_id).await {
        Ok(_) => true,
        Err(e) => {
            log_api_error("delete", chat_id, message_id, &e.to_string());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_errors_are_recognized() {
        assert!(is_benign(
            "Bad Request: message is not modified: specified new message content \
             and reply markup are exactly the same"
        ));
        assert!(is_benign("Bad Request: message to edit not found"));
        assert!(is_benign("Bad Request: message to delete not found"));
        assert!(is_benign("Bad Request: message can't be deleted"));
    }

    #[test]
    fn test_real_errors_are_not_benign() {
        assert!(!is_benign("Too Many Requests: retry after 5"));
        assert!(!is_benign("Forbidden: bot was blocked by the user"));
        assert!(!is_benign("network error"));
    }
}
