//! Riposte - self-hosted comments and moderation for static sites.
//!
//! This binary wires the full service together:
//! - HTTP API server (public comment endpoints plus the admin surface)
//! - Notification dispatcher (email, chat)
//! - Scheduled snapshots and database health monitoring

mod config;
mod jobs;

use std::path::PathBuf;

use clap::Parser;
use directories::ProjectDirs;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use riposte_core::{AdminDirectory, TokenSigner};
use riposte_outbound::{CaptchaVerifier, ChatNotifier, Dispatcher, Mailer, ReputationClient};
use riposte_server::{AppState, Server, ServerConfig};
use riposte_storage::Database;

use config::Config;

/// Riposte - self-hosted comments for static sites
#[derive(Parser, Debug)]
#[command(name = "riposte", version, about)]
struct Args {
    /// Override the PORT environment variable
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "riposte", "Riposte").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with daily file rotation alongside the console.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "riposte_app={level},riposte_server={level},riposte_storage={level},riposte_outbound={level},riposte_core={level},warn",
            level = log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(7)
                .filename_prefix("riposte")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().with_writer(std::io::stdout))
                    .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                    .init();

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Load the admin directory: inline JSON wins, then the config file, then
/// a minimal directory synthesized from bare emails.
fn load_admins(config: &Config) -> AdminDirectory {
    if let Some(json) = &config.admin_profiles_json {
        match AdminDirectory::from_json(json) {
            Ok(admins) => return admins,
            Err(e) => warn!("ADMIN_PROFILES_JSON is invalid: {}", e),
        }
    }

    if std::path::Path::new(&config.admin_config_path).exists() {
        match AdminDirectory::from_file(&config.admin_config_path) {
            Ok(admins) => return admins,
            Err(e) => warn!(
                "Admin config {} failed to load: {}",
                config.admin_config_path, e
            ),
        }
    }

    if !config.admin_emails.is_empty() {
        return AdminDirectory::from_emails(&config.admin_emails);
    }

    warn!("No admins configured; admin endpoints will reject every request");
    AdminDirectory::default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Keep the guard alive for the duration of the program.
    let _log_guard = init_logging(&args);

    info!("Starting Riposte...");

    let config = Config::from_env();

    let db = match &config.db_path {
        Some(path) => Database::with_path(path)?,
        None => Database::new()?,
    };
    match &config.db_path {
        Some(path) => info!("Database at {}", path),
        None => info!("Database at {:?}", Database::default_db_path()?),
    }

    let token_secret = config.token_secret.clone().unwrap_or_else(|| {
        warn!("TOKEN_SECRET not set, emailed action links use a development secret");
        "riposte-dev-secret".to_string()
    });
    let signer = TokenSigner::new(token_secret);

    let admins = load_admins(&config);
    info!("Admin directory has {} entries", admins.all().len());

    let mailer = Mailer::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
        config.public_base_url.clone(),
        signer.clone(),
    );
    let chat = ChatNotifier::new(
        config.telegram_bot_token.clone(),
        config.telegram_chat_id.clone(),
    );
    let reputation = ReputationClient::new(config.akismet_key.clone(), config.site_url.clone());
    let captcha = CaptchaVerifier::new(config.turnstile_secret.clone());

    for (name, configured) in [
        ("email", mailer.is_configured()),
        ("chat", chat.is_configured()),
        ("reputation", reputation.is_configured()),
        ("captcha", captcha.is_configured()),
    ] {
        info!("Outbound {} integration configured: {}", name, configured);
    }

    let notifier = Dispatcher::spawn(mailer, chat);
    let state = AppState::with_components(db.clone(), signer, admins, reputation, captcha, notifier);

    let server_config = ServerConfig {
        host: config.host.clone(),
        port: args.port.unwrap_or(config.port),
        db_path: None,
        cors_origins: config.allowed_origins.clone(),
    };
    let server = Server::with_state(server_config, state)?;
    info!("Listening on {}", server.addr());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance = tokio::spawn(jobs::run(db.clone(), shutdown_rx));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = maintenance.await;

    // Fold the WAL into the main file so the last writes survive restarts.
    if let Err(e) = db.checkpoint().await {
        warn!("Final checkpoint failed: {}", e);
    }

    info!("Riposte shut down");
    Ok(())
}
