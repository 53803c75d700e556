//! Operator report delivery.

use crate::config::Settings;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, User};
use tracing::{error, info};

/// Sends the announcement and the report document to every configured
/// operator. Failures are logged per operator and never abort the loop, so
/// one unreachable operator does not starve the rest.
pub async fn send_report_to_operators(bot: &Bot, settings: &Settings, from: &User, path: &Path) {
    let last_name = from.last_name.clone().unwrap_or_default();
    let announcement = match &from.username {
        Some(login) => format!(
            "Уважаемый администратор, поступила новая заявка от пользователя @{login} {} {last_name}",
            from.first_name
        ),
        None => format!(
            "Уважаемый администратор, поступила новая заявка от пользователя {} {last_name}",
            from.first_name
        ),
    };

    for operator in settings.operator_ids() {
        let chat_id = ChatId(operator);
        if let Err(e) = bot.send_message(chat_id, announcement.as_str()).await {
            error!("failed to announce report to operator {operator}: {e}");
            continue;
        }
        match bot
            .send_document(chat_id, InputFile::file(path.to_path_buf()))
            .await
        {
            Ok(_) => info!("report delivered to operator {operator}"),
            Err(e) => error!("failed to deliver report to operator {operator}: {e}"),
        }
    }
}
