//! Wire format for inline keyboard callbacks.
//!
//! Telegram caps callback data at 64 bytes, which is not enough for long
//! answer texts. Answer payloads therefore carry a truncated prefix of the
//! option text; [`resolve_option_text`] maps the prefix back to the full
//! catalog text on receipt.

use crate::catalog::Question;

/// Hard Telegram limit on `callback_data`, in bytes.
pub const CALLBACK_DATA_LIMIT: usize = 64;

/// Navigation requests issued from the question keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    /// Move to the previous question.
    Back,
    /// Move to the next question.
    Forward,
    /// Skip the current question without answering.
    Skip,
    /// Finish the questionnaire from the last question.
    End,
    /// Pause and keep all progress.
    Interrupt,
}

/// Choices offered on a checkpoint screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointChoice {
    /// Keep going with the next question.
    Continue,
    /// Pause here, same semantics as an interrupt.
    Defer,
}

/// Every callback the bot can receive, decoded from the wire string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Toggle a catalog option on the given step. `text` may be truncated.
    Answer {
        /// Zero-based question index the button belongs to.
        step: usize,
        /// Option text as carried on the wire, possibly truncated.
        text: String,
    },
    /// The "own answer" button.
    CustomAnswer,
    /// A navigation button.
    Nav(NavAction),
    /// A checkpoint button.
    Checkpoint(CheckpointChoice),
    /// Re-check the channel subscription.
    CheckSubscription,
}

impl CallbackAction {
    /// Serializes the action into callback data, guaranteed to fit the
    /// Telegram limit.
    pub fn encode(&self) -> String {
        match self {
            Self::Answer { step, text } => {
                let prefix = format!("answer:{step}:");
                let budget = CALLBACK_DATA_LIMIT.saturating_sub(prefix.len());
                format!("{prefix}{}", truncate_to_bytes(text, budget))
            }
            Self::CustomAnswer => "custom_answer".to_string(),
            Self::Nav(NavAction::Back) => "nav:back".to_string(),
            Self::Nav(NavAction::Forward) => "nav:forward".to_string(),
            Self::Nav(NavAction::Skip) => "nav:skip".to_string(),
            Self::Nav(NavAction::End) => "nav:end".to_string(),
            Self::Nav(NavAction::Interrupt) => "nav:interrupt".to_string(),
            Self::Checkpoint(CheckpointChoice::Continue) => "brakepoint:continue".to_string(),
            Self::Checkpoint(CheckpointChoice::Defer) => "brakepoint:interrupt".to_string(),
            Self::CheckSubscription => "check_sub".to_string(),
        }
    }

    /// Decodes callback data. Returns `None` for unknown or malformed
    /// payloads, which the dispatcher answers silently.
    pub fn parse(data: &str) -> Option<Self> {
        if let Some(rest) = data.strip_prefix("answer:") {
            let (step, text) = rest.split_once(':')?;
            let step = step.parse().ok()?;
            return Some(Self::Answer {
                step,
                text: text.to_string(),
            });
        }
        if let Some(nav) = data.strip_prefix("nav:") {
            let action = match nav {
                "back" => NavAction::Back,
                "forward" => NavAction::Forward,
                "skip" => NavAction::Skip,
                "end" => NavAction::End,
                "interrupt" => NavAction::Interrupt,
                _ => return None,
            };
            return Some(Self::Nav(action));
        }
        if let Some(choice) = data.strip_prefix("brakepoint:") {
            let choice = match choice {
                "continue" => CheckpointChoice::Continue,
                "interrupt" => CheckpointChoice::Defer,
                _ => return None,
            };
            return Some(Self::Checkpoint(choice));
        }
        match data {
            "custom_answer" => Some(Self::CustomAnswer),
            "check_sub" => Some(Self::CheckSubscription),
            _ => None,
        }
    }
}

/// Restores the full option text for an answer payload that may have been
/// truncated on encode. Unmatched payloads are returned as received.
pub fn resolve_option_text(question: &Question, step: usize, received: &str) -> String {
    let prefix_len = format!("answer:{step}:").len();
    let budget = CALLBACK_DATA_LIMIT.saturating_sub(prefix_len);
    question
        .options
        .iter()
        .map(|option| option.text.as_str())
        .find(|text| truncate_to_bytes(text, budget) == received)
        .unwrap_or(received)
        .to_string()
}

/// Cuts `text` down to at most `max_bytes` bytes without splitting a UTF-8
/// character.
pub fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AnswerOption;

    fn question_with(options: &[&str]) -> Question {
        Question {
            text: "Вопрос".to_string(),
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

    #[test]
    fn test_nav_roundtrip() {
        for action in [
            NavAction::Back,
            NavAction::Forward,
            NavAction::Skip,
            NavAction::End,
            NavAction::Interrupt,
        ] {
            let encoded = CallbackAction::Nav(action).encode();
            assert_eq!(
                CallbackAction::parse(&encoded),
                Some(CallbackAction::Nav(action))
            );
        }
    }

    #[test]
    fn test_checkpoint_defer_shares_interrupt_wire_word() {
        let encoded = CallbackAction::Checkpoint(CheckpointChoice::Defer).encode();
        assert_eq!(encoded, "brakepoint:interrupt");
        assert_eq!(
            CallbackAction::parse(&encoded),
            Some(CallbackAction::Checkpoint(CheckpointChoice::Defer))
        );
    }

    #[test]
    fn test_answer_roundtrip_short_text() {
        let action = CallbackAction::Answer {
            step: 4,
            text: "Минимализм".to_string(),
        };
        assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
    }

    #[test]
    fn test_answer_encode_fits_limit_for_long_cyrillic() {
        let long = "Очень длинный вариант ответа про перепланировку квартиры и зонирование".repeat(2);
        let encoded = CallbackAction::Answer {
            step: 11,
            text: long,
        }
        .encode();
        assert!(encoded.len() <= CALLBACK_DATA_LIMIT, "{} bytes", encoded.len());
        assert!(String::from_utf8(encoded.into_bytes()).is_ok());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ёлки-палки";
        for max in 0..=text.len() {
            let cut = truncate_to_bytes(text, max);
            assert!(cut.len() <= max);
            assert!(text.starts_with(cut));
        }
    }

    #[test]
    fn test_resolve_recovers_truncated_option() {
        let full = "Сканди с элементами лофта и большим количеством дерева в отделке".to_string();
        let question = question_with(&[full.as_str(), "Классика"]);
        let encoded = CallbackAction::Answer {
            step: 2,
            text: full.clone(),
        }
        .encode();
        let Some(CallbackAction::Answer { step, text }) = CallbackAction::parse(&encoded) else {
            panic!("expected answer payload");
        };
        assert!(text.len() < full.len());
        assert_eq!(resolve_option_text(&question, step, &text), full);
    }

    #[test]
    fn test_resolve_passes_unknown_text_through() {
        let question = question_with(&["Классика"]);
        assert_eq!(resolve_option_text(&question, 0, "Лофт"), "Лофт");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("answer:"), None);
        assert_eq!(CallbackAction::parse("answer:x:Лофт"), None);
        assert_eq!(CallbackAction::parse("nav:sideways"), None);
        assert_eq!(CallbackAction::parse("brakepoint:maybe"), None);
        assert_eq!(CallbackAction::parse("portfolio:3"), None);
    }
}
