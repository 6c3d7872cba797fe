use std::sync::Arc;

use url::Url;

use common::content::{ContentError, ContentStore};
use common::session::{FilesystemSessionStore, SessionError, SessionStore};
use common::token::TokenCodec;

use crate::database::{Database, DatabaseSetupError};
use crate::http_server::auth::CookiePolicy;
use crate::service_config::Config;

/// Main service state, shared by every request handler
#[derive(Clone)]
pub struct State {
    database: Database,
    content: ContentStore,
    sessions: Arc<dyn SessionStore>,
    tokens: TokenCodec,
    cookies: CookiePolicy,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let database = match config.sqlite_path {
            Some(ref path) => {
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                let sqlite_database_url = Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)?;
                tracing::info!("Database URL: {:?}", sqlite_database_url);
                Database::connect(&sqlite_database_url).await?
            }
            // otherwise just set up an in-memory database
            None => {
                tracing::warn!("no database path configured, ownership records will not persist");
                Database::in_memory().await?
            }
        };

        // 2. Setup content store
        let content = ContentStore::open(&config.uploads_path).await?;
        tracing::info!(path = %content.root().display(), "content store ready");

        // 3. Setup sessions and tokens from the shared secret
        let secret = config.signing_secret.as_bytes();
        let sessions = FilesystemSessionStore::new(&config.sessions_path, secret)
            .await?
            .with_max_age(config.session_max_age);
        sessions.purge_expired().await?;
        tracing::info!(path = %sessions.path().display(), "session store ready");
        let tokens = TokenCodec::with_lifetime(secret, config.token_lifetime);

        let cookies = CookiePolicy {
            secure: config.secure_cookies,
            session_max_age: config.session_max_age,
        };

        Ok(Self::new(database, content, Arc::new(sessions), tokens, cookies))
    }

    pub fn new(
        database: Database,
        content: ContentStore,
        sessions: Arc<dyn SessionStore>,
        tokens: TokenCodec,
        cookies: CookiePolicy,
    ) -> Self {
        Self {
            database,
            content,
            sessions,
            tokens,
            cookies,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub fn cookies(&self) -> &CookiePolicy {
        &self.cookies
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Database setup error: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Content store setup error: {0}")]
    ContentStoreError(#[from] ContentError),
    #[error("Session store setup error: {0}")]
    SessionStoreError(#[from] SessionError),
}
