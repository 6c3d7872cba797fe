use std::net::SocketAddr;

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
    // Largest accepted request body, in bytes
    pub max_file_size: usize,
}

impl Config {
    pub fn new(listen_addr: SocketAddr, max_file_size: usize) -> Self {
        tracing::info!(
            "Creating HTTP server Config: listen_addr={}, max_file_size={}",
            listen_addr,
            max_file_size
        );
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
            max_file_size,
        }
    }

    pub fn with_log_level(mut self, log_level: tracing::Level) -> Self {
        self.log_level = log_level;
        self
    }
}
