/// Callback payload encoding and decoding
pub mod callback;
/// Command and menu-button handlers
pub mod commands;
/// Reply and inline keyboard builders
pub mod keyboard;
/// Telegram API helpers tolerant of benign errors
pub mod messaging;
/// Operator report delivery
pub mod notify;
/// Questionnaire flow handlers
pub mod questionnaire;
/// User state and dialogue management
pub mod state;
/// Channel subscription gate
pub mod subscription;
