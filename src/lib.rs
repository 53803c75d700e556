#![deny(missing_docs)]
//! Telegram bot that walks interior-design clients through a project brief:
//! it gates access behind a channel subscription, collects a phone number,
//! runs the questionnaire with resumable progress, stores every answer in
//! PostgreSQL and delivers a .docx report to the studio operators.

/// Telegram surface: dialogue states, handlers, keyboards, callback codec
pub mod bot;
/// Question catalog loaded from `questions.json`
pub mod catalog;
/// Configuration and settings management
pub mod config;
/// PostgreSQL persistence layer
pub mod db;
/// Report document rendering
pub mod report;
/// In-process questionnaire sessions and inactivity timers
pub mod session;
