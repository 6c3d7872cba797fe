use std::net::SocketAddr;

use clap::Args;

use webfiles_daemon::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Address the server listens on
    #[arg(long, default_value = "127.0.0.1:7777")]
    pub listen_addr: SocketAddr,

    /// Largest accepted upload, in bytes
    #[arg(long)]
    pub max_file_size: Option<usize>,

    /// Mark cookies Secure (serve over HTTPS only)
    #[arg(long)]
    pub secure_cookies: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] webfiles_daemon::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            listen_addr: self.listen_addr,
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            secure_cookies: self.secure_cookies,
            ..defaults
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized webfiles directory at: {}\n\
             - Database: {}\n\
             - Signing key: {}\n\
             - Uploads: {}\n\
             - Sessions: {}\n\
             - Config: {}\n\
             - Listen address: {}",
            state.webfiles_dir.display(),
            state.db_path.display(),
            state.key_path.display(),
            state.uploads_path.display(),
            state.sessions_path.display(),
            state.config_path.display(),
            state.config.listen_addr,
        );

        Ok(output)
    }
}
