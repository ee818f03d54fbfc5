//! Application state for the API server.

use std::sync::Arc;

use riposte_core::{AdminDirectory, Sanitizer, SpamScorer, TokenSigner};
use riposte_outbound::{CaptchaVerifier, ChatNotifier, Dispatcher, Mailer, ReputationClient};
use riposte_storage::Database;

/// Token secret used by the convenience constructors. Deployments build
/// their state through [`AppState::with_components`] with a real secret.
const DEV_TOKEN_SECRET: &str = "riposte-dev-secret";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database handle. Reads run inline, writes go through the queue.
    pub db: Database,
    /// Heuristic spam scorer.
    pub scorer: Arc<SpamScorer>,
    /// HTML sanitizer for comment bodies.
    pub sanitizer: Arc<Sanitizer>,
    /// Signer for one-click moderation links.
    pub signer: TokenSigner,
    /// Configured administrators.
    pub admins: Arc<AdminDirectory>,
    /// External reputation checker.
    pub reputation: ReputationClient,
    /// CAPTCHA verifier.
    pub captcha: CaptchaVerifier,
    /// Notification dispatcher.
    pub notifier: Dispatcher,
}

impl AppState {
    /// Creates application state over the given database with no outbound
    /// integrations configured. Must run inside a Tokio runtime.
    pub fn new(db: Database) -> Self {
        let signer = TokenSigner::new(DEV_TOKEN_SECRET);
        let mailer = Mailer::new(
            None,
            "Comments <no-reply@localhost>".to_string(),
            String::new(),
            signer.clone(),
        );

        Self {
            db,
            scorer: Arc::new(SpamScorer::new()),
            sanitizer: Arc::new(Sanitizer::new()),
            signer,
            admins: Arc::new(AdminDirectory::default()),
            reputation: ReputationClient::new(None, String::new()),
            captcha: CaptchaVerifier::new(None),
            notifier: Dispatcher::spawn(mailer, ChatNotifier::new(None, None)),
        }
    }

    /// Creates application state with default in-memory database.
    pub fn in_memory() -> Self {
        Self::new(Database::in_memory().expect("Failed to create in-memory database"))
    }

    /// Creates application state with every component supplied by the caller.
    pub fn with_components(
        db: Database,
        signer: TokenSigner,
        admins: AdminDirectory,
        reputation: ReputationClient,
        captcha: CaptchaVerifier,
        notifier: Dispatcher,
    ) -> Self {
        Self {
            db,
            scorer: Arc::new(SpamScorer::new()),
            sanitizer: Arc::new(Sanitizer::new()),
            signer,
            admins: Arc::new(admins),
            reputation,
            captcha,
            notifier,
        }
    }
}
