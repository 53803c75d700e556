//! Reply and inline keyboard builders.

use crate::bot::callback::{CallbackAction, CheckpointChoice, NavAction};
use crate::catalog::Question;
use crate::config::Settings;
use teloxide::types::{
    ButtonRequest, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};

/// Label of the menu button that starts a fresh run; the text handlers
/// match on the same constant
pub const START_BUTTON: &str = "Начать";

/// Label of the menu button that resumes a saved run
pub const RESUME_BUTTON: &str = "Продолжить";

/// Persistent menu shown after /start. The first button reads "Продолжить"
/// once the user has saved progress.
pub fn main_menu(last_step: i32) -> KeyboardMarkup {
    let first = if last_step > 0 { RESUME_BUTTON } else { START_BUTTON };
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(first)],
        vec![KeyboardButton::new("Хелпер")],
    ])
    .resize_keyboard()
}

/// Menu shown after /reset, always offering a fresh run.
pub fn restart_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(START_BUTTON)],
        vec![KeyboardButton::new("Хелпер")],
    ])
    .resize_keyboard()
}

/// One-time menu shown after an interrupt.
pub fn resume_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(RESUME_BUTTON)],
        vec![KeyboardButton::new("Меню")],
    ])
    .resize_keyboard()
    .one_time_keyboard()
}

/// Single-button keyboard requesting the user's contact.
pub fn phone_request() -> KeyboardMarkup {
    let share = KeyboardButton::new("Поделиться номером телефона").request(ButtonRequest::Contact);
    KeyboardMarkup::new(vec![vec![share]])
        .resize_keyboard()
        .one_time_keyboard()
}

/// Inline keyboard attached to subscription prompts: a link to the channel
/// plus a re-check button.
pub fn subscribe(settings: &Settings) -> InlineKeyboardMarkup {
    let mut rows = Vec::new();
    if let Ok(url) = reqwest::Url::parse(&settings.channel_url()) {
        rows.push(vec![InlineKeyboardButton::url("Подписаться на канал", url)]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "Проверить подписку",
        CallbackAction::CheckSubscription.encode(),
    )]);
    InlineKeyboardMarkup::new(rows)
}

/// Inline keyboard for one question. Checkpoint questions get a dedicated
/// two-button layout; everything else gets the option list, the own-answer
/// button and the navigation rows.
pub fn question(
    question: &Question,
    step: usize,
    total: usize,
    selected: &[String],
    has_custom: bool,
) -> InlineKeyboardMarkup {
    if question.checkpoint {
        return checkpoint();
    }

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    for option in &question.options {
        let marked = selected.iter().any(|text| text == &option.text);
        let label = if marked {
            format!("{} ✅", option.text)
        } else {
            option.text.clone()
        };
        let data = CallbackAction::Answer {
            step,
            text: option.text.clone(),
        }
        .encode();
        rows.push(vec![InlineKeyboardButton::callback(label, data)]);
    }

    let custom_label = if has_custom {
        "Свой вариант ✅"
    } else {
        "Свой вариант"
    };
    rows.push(vec![InlineKeyboardButton::callback(
        custom_label,
        CallbackAction::CustomAnswer.encode(),
    )]);

    let mut nav = Vec::new();
    if step > 0 {
        nav.push(InlineKeyboardButton::callback(
            "⬅️ Предыдущий",
            CallbackAction::Nav(NavAction::Back).encode(),
        ));
    }
    if step + 1 < total {
        nav.push(InlineKeyboardButton::callback(
            "Следующий ➡️",
            CallbackAction::Nav(NavAction::Forward).encode(),
        ));
    }
    if !nav.is_empty() {
        rows.push(nav);
    }

    if step + 1 < total {
        rows.push(vec![InlineKeyboardButton::callback(
            "Пропустить вопрос ➡️",
            CallbackAction::Nav(NavAction::Skip).encode(),
        )]);
    } else {
        rows.push(vec![InlineKeyboardButton::callback(
            "❎ Завершить опрос ❎",
            CallbackAction::Nav(NavAction::End).encode(),
        )]);
    }
    rows.push(vec![InlineKeyboardButton::callback(
        "❌ Прерваться ❌",
        CallbackAction::Nav(NavAction::Interrupt).encode(),
    )]);

    InlineKeyboardMarkup::new(rows)
}

fn checkpoint() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "Да, погнали",
            CallbackAction::Checkpoint(CheckpointChoice::Continue).encode(),
        )],
        vec![InlineKeyboardButton::callback(
            "Нет, позже",
            CallbackAction::Checkpoint(CheckpointChoice::Defer).encode(),
        )],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AnswerOption;
    use teloxide::types::InlineKeyboardButtonKind;

    fn plain_question(options: &[&str]) -> Question {
        Question {
            text: "Какой стиль вам ближе?".to_string(),
            options: options
                .iter()
                .map(|text| AnswerOption {
                    text: (*text).to_string(),
                    image: None,
                })
                .collect(),
            checkpoint: false,
        }
    }

    fn callback_data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("expected callback button, got {other:?}"),
        }
    }

    #[test]
    fn test_question_keyboard_marks_selected_options() {
        let q = plain_question(&["Лофт", "Классика"]);
        let markup = question(&q, 1, 5, &["Классика".to_string()], true);
        let labels: Vec<&str> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(|b| b.text.as_str())
            .collect();
        assert!(labels.contains(&"Лофт"));
        assert!(labels.contains(&"Классика ✅"));
        assert!(labels.contains(&"Свой вариант ✅"));
    }

    #[test]
    fn test_first_question_has_no_back_button() {
        let q = plain_question(&["Лофт"]);
        let markup = question(&q, 0, 5, &[], false);
        let data: Vec<&str> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(callback_data)
            .collect();
        assert!(!data.contains(&"nav:back"));
        assert!(data.contains(&"nav:forward"));
        assert!(data.contains(&"nav:skip"));
        assert!(data.contains(&"nav:interrupt"));
    }

    #[test]
    fn test_last_question_offers_end_instead_of_skip() {
        let q = plain_question(&["Лофт"]);
        let markup = question(&q, 4, 5, &[], false);
        let data: Vec<&str> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(callback_data)
            .collect();
        assert!(data.contains(&"nav:end"));
        assert!(data.contains(&"nav:back"));
        assert!(!data.contains(&"nav:skip"));
        assert!(!data.contains(&"nav:forward"));
    }

    #[test]
    fn test_checkpoint_question_gets_two_buttons_only() {
        let q = Question {
            text: "Готовы продолжить?".to_string(),
            options: Vec::new(),
            checkpoint: true,
        };
        let markup = question(&q, 6, 12, &[], false);
        let data: Vec<&str> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(callback_data)
            .collect();
        assert_eq!(data, vec!["brakepoint:continue", "brakepoint:interrupt"]);
    }

    #[test]
    fn test_zero_option_question_still_navigates() {
        let q = plain_question(&[]);
        let markup = question(&q, 2, 5, &[], false);
        let data: Vec<&str> = markup
            .inline_keyboard
            .iter()
            .flatten()
            .map(callback_data)
            .collect();
        assert!(data.contains(&"custom_answer"));
        assert!(data.contains(&"nav:back"));
        assert!(data.contains(&"nav:forward"));
    }

    #[test]
    fn test_main_menu_follows_progress() {
        let fresh = main_menu(0);
        let returning = main_menu(7);
        assert_eq!(fresh.keyboard[0][0].text, "Начать");
        assert_eq!(returning.keyboard[0][0].text, "Продолжить");
    }
}
