use brief_bot::bot::commands::Command;
use brief_bot::bot::state::State;
use brief_bot::catalog::Catalog;
use brief_bot::config::Settings;
use brief_bot::session::SessionStore;
use brief_bot::{bot, db};
use dotenvy::dotenv;
use regex::Regex;
use sqlx::PgPool;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    db_url: Regex,
    db_password: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            db_url: Regex::new(r"(postgres(?:ql)?://[^:/\s]+:)[^@\s]+@")?,
            db_password: Regex::new(r"DB_PASSWORD=[^\s&]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self.db_url.replace_all(&output, "$1[MASKED]@").to_string();
        output = self
            .db_password
            .replace_all(&output, "DB_PASSWORD=[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting interior design brief bot...");

    // Load settings
    let settings = init_settings();

    // Load the question catalog
    let catalog = init_catalog(&settings);

    // Connect to PostgreSQL and apply migrations
    let pool = init_db(&settings).await;

    // Initialize Bot
    let bot = Bot::new(settings.bot_api_token.clone());

    // Initialize dialogue state storage
    let bot_state = init_bot_state();

    // Registry of live questionnaire sessions
    let sessions = Arc::new(SessionStore::new());

    // Setup handlers
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![pool, catalog, settings, bot_state, sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_catalog(settings: &Settings) -> Arc<Catalog> {
    match Catalog::load(&settings.questions_path) {
        Ok(catalog) => {
            info!("Question catalog loaded: {} questions.", catalog.len());
            Arc::new(catalog)
        }
        Err(e) => {
            error!("Failed to load question catalog: {}", e);
            std::process::exit(1);
        }
    }
}

async fn init_db(settings: &Settings) -> PgPool {
    match db::create_pool(&settings.database_url()).await {
        Ok(pool) => {
            info!("PostgreSQL pool initialized.");
            if let Err(e) = db::run_migrations(&pool).await {
                error!("Failed to apply database migrations: {}", e);
                std::process::exit(1);
            }
            info!("Database migrations applied.");
            pool
        }
        Err(e) => {
            error!("Failed to connect to PostgreSQL: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_bot_state() -> Arc<InMemStorage<State>> {
    InMemStorage::<State>::new()
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<State>, State>()
                .branch(
                    dptree::filter(|q: CallbackQuery| q.data.as_deref() == Some("check_sub"))
                        .endpoint(on_check_subscription),
                )
                .branch(
                    dptree::filter(|q: CallbackQuery| q.data.as_deref() == Some("nav:end"))
                        .endpoint(on_finish),
                )
                .endpoint(on_questionnaire_callback),
        )
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<State>, State>()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .branch(dptree::case![Command::Start].endpoint(on_start))
                        .branch(dptree::case![Command::Go].endpoint(on_go))
                        .branch(dptree::case![Command::Menu].endpoint(on_menu))
                        .branch(dptree::case![Command::Reset].endpoint(on_reset))
                        .branch(dptree::case![Command::Help].endpoint(on_help))
                        .branch(dptree::case![Command::Contacts].endpoint(on_contacts))
                        .branch(dptree::case![Command::Manual].endpoint(on_manual)),
                )
                .branch(dptree::case![State::CollectingPhone].endpoint(on_phone))
                .branch(dptree::case![State::EnteringCustomAnswer].endpoint(on_custom_answer))
                .branch(dptree::case![State::AwaitingTargetUser].endpoint(on_manual_target))
                .branch(
                    dptree::case![State::Asking]
                        .filter(|msg: Message| msg.text().is_some())
                        .endpoint(on_questionnaire_text),
                )
                .branch(
                    dptree::case![State::Idle]
                        .filter(|msg: Message| msg.text().is_some())
                        .endpoint(on_menu_text),
                ),
        )
}

async fn on_start(
    bot: Bot,
    msg: Message,
    pool: PgPool,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::start(bot, msg, pool, settings).await {
        error!("Start handler error: {:#}", e);
    }
    respond(())
}

async fn on_go(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::questionnaire::start_or_resume(
        bot, msg, dialogue, pool, catalog, sessions, settings,
    ))
    .await
    {
        error!("GO handler error: {:#}", e);
    }
    respond(())
}

async fn on_menu(
    bot: Bot,
    msg: Message,
    pool: PgPool,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::menu(bot, msg, pool, settings).await {
        error!("Menu handler error: {:#}", e);
    }
    respond(())
}

async fn on_reset(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::reset(bot, msg, dialogue, pool, sessions, settings).await {
        error!("Reset handler error: {:#}", e);
    }
    respond(())
}

async fn on_help(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::help(bot, msg).await {
        error!("Help handler error: {:#}", e);
    }
    respond(())
}

async fn on_contacts(
    bot: Bot,
    msg: Message,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::contacts(bot, msg, settings).await {
        error!("Contacts handler error: {:#}", e);
    }
    respond(())
}

async fn on_manual(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::manual(bot, msg, dialogue, settings).await {
        error!("Manual handler error: {:#}", e);
    }
    respond(())
}

async fn on_manual_target(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) =
        bot::commands::manual_target(bot, msg, dialogue, pool, catalog, settings).await
    {
        error!("Manual target handler error: {:#}", e);
    }
    respond(())
}

async fn on_phone(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::questionnaire::phone_received(
        bot, msg, dialogue, pool, catalog, sessions, settings,
    ))
    .await
    {
        error!("Phone handler error: {:#}", e);
    }
    respond(())
}

async fn on_custom_answer(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::questionnaire::custom_text_received(
        bot, msg, dialogue, pool, catalog, sessions,
    ))
    .await
    {
        error!("Custom answer handler error: {:#}", e);
    }
    respond(())
}

async fn on_questionnaire_text(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::questionnaire::stray_text(
        bot, msg, dialogue, pool, catalog, sessions, settings,
    ))
    .await
    {
        error!("Questionnaire text handler error: {:#}", e);
    }
    respond(())
}

async fn on_menu_text(
    bot: Bot,
    msg: Message,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::commands::idle_text(
        bot, msg, dialogue, pool, catalog, sessions, settings,
    ))
    .await
    {
        error!("Menu text handler error: {:#}", e);
    }
    respond(())
}

async fn on_questionnaire_callback(
    bot: Bot,
    q: CallbackQuery,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::questionnaire::handle_callback(
        bot, q, dialogue, pool, catalog, sessions,
    ))
    .await
    {
        error!("Callback handler error: {:#}", e);
    }
    respond(())
}

async fn on_finish(
    bot: Bot,
    q: CallbackQuery,
    dialogue: Dialogue<State, InMemStorage<State>>,
    pool: PgPool,
    catalog: Arc<Catalog>,
    sessions: Arc<SessionStore>,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = Box::pin(bot::questionnaire::finish(
        bot, q, dialogue, pool, catalog, sessions, settings,
    ))
    .await
    {
        error!("Finish handler error: {:#}", e);
    }
    respond(())
}

async fn on_check_subscription(
    bot: Bot,
    q: CallbackQuery,
    pool: PgPool,
    settings: Arc<Settings>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::commands::confirm_subscription(bot, q, pool, settings).await {
        error!("Subscription check handler error: {:#}", e);
    }
    respond(())
}
