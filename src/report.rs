//! DOCX report rendering.
//!
//! A report is built from persisted data only (`data_questions` plus
//! `user_answers`), never from the in-memory session, so it can be generated
//! long after the run finished, including through the /manual command.

use crate::catalog::{Catalog, Question};
use crate::db::answers::Answers;
use crate::db::models::{AnswerRecord, RequestRecord};
use crate::db::requests::Requests;
use crate::db::StorageError;
use anyhow::{anyhow, Context, Result};
use docx_rs::{Docx, Paragraph, Pic, Run};
use sqlx::PgPool;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Illustrations are embedded as 1x1 inch squares.
const IMAGE_SIZE_EMU: u32 = 914_400;

// Run sizes are half-points: 20pt title, 16pt section, 14pt question.
const TITLE_SIZE: usize = 40;
const SECTION_SIZE: usize = 32;
const QUESTION_SIZE: usize = 28;

const MAX_NAME_LEN: usize = 50;

/// Generates the report for one questionnaire run and writes it under
/// `reports_dir`. Returns the path of the written file.
pub async fn generate(
    pool: &PgPool,
    catalog: &Catalog,
    reports_dir: &Path,
    user_id: i64,
    request_id: i64,
) -> Result<PathBuf> {
    let request = Requests::find(pool, user_id, request_id)
        .await?
        .ok_or(StorageError::NoRequest(user_id))?;
    let answers = Answers::for_request(pool, user_id, request_id).await?;
    let images = fetch_answer_images(catalog, &answers).await;

    let bytes = render(catalog, &request, &answers, &images)?;

    tokio::fs::create_dir_all(reports_dir)
        .await
        .with_context(|| format!("failed to create report directory {}", reports_dir.display()))?;
    let path = reports_dir.join(file_name(&request));
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("failed to write report {}", path.display()))?;
    info!("report for request {request_id} written to {}", path.display());
    Ok(path)
}

/// Downloads the illustrations of every selected option. A failed download
/// only drops that one picture from the report.
async fn fetch_answer_images(
    catalog: &Catalog,
    answers: &[AnswerRecord],
) -> HashMap<(i32, String), Vec<u8>> {
    let mut images = HashMap::new();
    let client = reqwest::Client::new();
    for (index, question) in catalog.questions().iter().enumerate() {
        let step = i32::try_from(index).unwrap_or_default();
        for option in &question.options {
            let Some(url) = option.image.as_deref() else {
                continue;
            };
            if !has_button_answer(answers, step, &option.text) {
                continue;
            }
            match download_image(&client, url).await {
                Ok(bytes) => {
                    images.insert((step, option.text.clone()), bytes);
                }
                Err(e) => warn!("skipping illustration {url} for question {}: {e}", index + 1),
            }
        }
    }
    images
}

async fn download_image(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

fn has_button_answer(answers: &[AnswerRecord], step: i32, text: &str) -> bool {
    answers
        .iter()
        .any(|row| row.question_step == step && row.answer_text == text && !row.is_custom())
}

fn render(
    catalog: &Catalog,
    request: &RequestRecord,
    answers: &[AnswerRecord],
    images: &HashMap<(i32, String), Vec<u8>>,
) -> Result<Vec<u8>> {
    let mut doc = Docx::new().add_paragraph(heading("Отчёт по анкете", TITLE_SIZE));
    for line in header_lines(request) {
        doc = doc.add_paragraph(plain(&line));
    }
    doc = doc.add_paragraph(Paragraph::new());
    doc = doc.add_paragraph(heading("Ответы пользователя", SECTION_SIZE));

    for (index, question) in catalog.questions().iter().enumerate() {
        let step = i32::try_from(index).unwrap_or_default();
        doc = doc.add_paragraph(heading(
            &format!("Вопрос {}: {}", index + 1, question.text),
            QUESTION_SIZE,
        ));
        for line in question_lines(question, step, answers) {
            doc = doc.add_paragraph(plain(&line));
        }
        for option in &question.options {
            if let Some(bytes) = images.get(&(step, option.text.clone())) {
                let pic = Pic::new(bytes).size(IMAGE_SIZE_EMU, IMAGE_SIZE_EMU);
                doc = doc.add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)));
            }
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut buffer)
        .map_err(|e| anyhow!("failed to pack report document: {e}"))?;
    Ok(buffer.into_inner())
}

fn header_lines(request: &RequestRecord) -> Vec<String> {
    let full_name = format!(
        "{} {}",
        request.tg_firstname.clone().unwrap_or_default(),
        request.tg_lastname.clone().unwrap_or_default()
    );
    let full_name = full_name.trim();
    let login = request
        .tg_login
        .clone()
        .map_or_else(|| "не указан".to_string(), |login| format!("@{login}"));
    vec![
        format!("Заявка №{}", request.id),
        format!("Дата начала: {}", request.step_start.format(DATE_FORMAT)),
        format!("Последняя активность: {}", request.step_time.format(DATE_FORMAT)),
        format!(
            "Пользователь: {}",
            if full_name.is_empty() { "не указан" } else { full_name }
        ),
        format!("Логин: {login}"),
        format!(
            "Телефон: {}",
            request.phone.clone().unwrap_or_else(|| "не указан".to_string())
        ),
        format!("Telegram ID: {}", request.id_telegram),
    ]
}

/// The answer lines printed under one question: every selected option in
/// catalog order, then the free-text answer, or a placeholder when the
/// question was never answered.
fn question_lines(question: &Question, step: i32, answers: &[AnswerRecord]) -> Vec<String> {
    let mut lines = Vec::new();
    for option in &question.options {
        if has_button_answer(answers, step, &option.text) {
            lines.push(format!("Ответ: {} (стандартный)", option.text));
        }
    }
    if let Some(custom) = answers
        .iter()
        .find(|row| row.question_step == step && row.is_custom())
    {
        lines.push(format!("Ответ: {} (пользовательский)", custom.answer_text));
    }
    if lines.is_empty() {
        lines.push("Пользователь не ответил на этот вопрос.".to_string());
    }
    lines
}

fn heading(text: &str, size: usize) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text).size(size).bold())
}

fn plain(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

/// `"{name} {telegram id} {request id}.docx"`, with filesystem-unsafe
/// characters removed and the name capped at 50 characters. The username is
/// preferred, then the real name, then a `user` fallback.
fn file_name(request: &RequestRecord) -> String {
    let display_name = request.tg_login.clone().unwrap_or_else(|| {
        let full = format!(
            "{} {}",
            request.tg_firstname.clone().unwrap_or_default(),
            request.tg_lastname.clone().unwrap_or_default()
        );
        let full = full.trim().to_string();
        if full.is_empty() {
            "user".to_string()
        } else {
            full
        }
    });
    format!(
        "{} {} {}.docx",
        sanitize_name(&display_name),
        request.id_telegram,
        request.id
    )
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .take(MAX_NAME_LEN)
        .collect()
}
