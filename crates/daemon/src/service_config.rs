use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// The shared server secret. Signs tokens and keys the session store.
#[derive(Clone)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(..)")
    }
}

#[derive(Debug)]
pub struct Config {
    // http server configuration
    /// Address the HTTP server listens on
    pub listen_addr: SocketAddr,
    /// Largest accepted request body, in bytes
    pub max_file_size: usize,

    // auth configuration
    pub signing_secret: SigningSecret,
    /// Lifetime of newly minted tokens
    pub token_lifetime: Duration,
    /// Max-Age of the session cookie
    pub session_max_age: Duration,
    /// Mark cookies `Secure`
    pub secure_cookies: bool,

    // data store configuration
    /// Root of the content store
    pub uploads_path: PathBuf,
    /// Directory of persisted cookie sessions
    pub sessions_path: PathBuf,
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
