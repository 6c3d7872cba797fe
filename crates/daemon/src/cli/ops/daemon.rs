use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::Args;

use webfiles_daemon::service_config::SigningSecret;
use webfiles_daemon::state::AppState;
use webfiles_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override the listen address (default from config)
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Override the largest accepted upload, in bytes (default from config)
    #[arg(long)]
    pub max_file_size: Option<usize>,

    /// Shared signing secret (default: the key file in the config directory)
    #[arg(long, env = "WEBFILES_SIGNING_KEY", hide_env_values = true)]
    pub signing_key: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log level (default from config)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] webfiles_daemon::state::StateError),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("signing key is empty")]
    EmptySigningKey,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        // Load state from config path (or default ~/.webfiles)
        let state = AppState::load(ctx.config_path.clone())?;

        let signing_key = match &self.signing_key {
            Some(key) if key.trim().is_empty() => return Err(DaemonError::EmptySigningKey),
            Some(key) => key.trim().to_string(),
            None => state.load_key()?,
        };

        let log_level = self
            .log_level
            .as_deref()
            .unwrap_or(&state.config.log_level);
        let log_level = tracing::Level::from_str(log_level)
            .map_err(|_| DaemonError::InvalidLogLevel(log_level.to_string()))?;

        let config = ServiceConfig {
            listen_addr: self.listen_addr.unwrap_or(state.config.listen_addr),
            max_file_size: self.max_file_size.unwrap_or(state.config.max_file_size),
            signing_secret: SigningSecret::new(signing_key),
            token_lifetime: Duration::from_secs(state.config.token_lifetime_secs),
            session_max_age: Duration::from_secs(state.config.session_max_age_secs),
            secure_cookies: state.config.secure_cookies,
            uploads_path: state.uploads_path,
            sessions_path: state.sessions_path,
            sqlite_path: Some(state.db_path),
            log_level,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}
