pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "webfiles")]
#[command(about = "Anonymous file upload and download server")]
pub struct Args {
    /// Server to talk to (defaults to the configured listen address, then http://localhost:7777)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the webfiles config directory (defaults to ~/.webfiles)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Token presented as a bearer credential on every request
    #[arg(long, global = true, env = "WEBFILES_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: crate::Command,
}
