use serde::{Deserialize, Serialize};

/// Represents the current state of the user dialogue
#[derive(Clone, Serialize, Deserialize, Default)]
pub enum State {
    /// No questionnaire activity
    #[default]
    Idle,
    /// Waiting for the user to share their phone number
    CollectingPhone,
    /// Walking through the question list
    Asking,
    /// Waiting for a free-text answer to the current question
    EnteringCustomAnswer,
    /// An operator ran /manual and must name the target user
    AwaitingTargetUser,
}
