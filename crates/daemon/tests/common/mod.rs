//! Shared helpers for driving the HTTP router in-process
#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use common::token::TokenCodec;
use webfiles_daemon::http_server;
use webfiles_daemon::service_config::SigningSecret;
use webfiles_daemon::{ServiceConfig, ServiceState};

pub const SECRET: &[u8] = b"integration-test-secret";
pub const BOUNDARY: &str = "webfiles-test-boundary";

pub struct TestServer {
    pub router: Router,
    pub state: ServiceState,
    pub temp: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::with_max_file_size(1 << 20).await
    }

    pub async fn with_max_file_size(max_file_size: usize) -> Self {
        let temp = TempDir::new().unwrap();
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            max_file_size,
            signing_secret: SigningSecret::new(SECRET),
            token_lifetime: Duration::from_secs(3600),
            session_max_age: Duration::from_secs(3600),
            secure_cookies: false,
            uploads_path: temp.path().join("uploads"),
            sessions_path: temp.path().join("cookiestore"),
            sqlite_path: None,
            log_level: tracing::Level::INFO,
            log_dir: None,
        };
        let state = ServiceState::from_config(&config).await.unwrap();
        Self {
            router: router_for(state.clone(), max_file_size),
            state,
            temp,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn uploads(&self) -> &Path {
        self.state.content().root()
    }
}

pub fn router_for(state: ServiceState, max_file_size: usize) -> Router {
    let config = http_server::Config::new("127.0.0.1:0".parse().unwrap(), max_file_size);
    http_server::router(&config, state)
}

pub fn codec() -> TokenCodec {
    TokenCodec::new(SECRET)
}

/// A valid token for `identity`
pub fn token_for(identity: &str) -> String {
    codec().issue(identity).unwrap().0
}

/// How a test request presents itself
#[derive(Default, Clone)]
pub struct Client {
    pub bearer: Option<String>,
    pub cookies: Vec<(String, String)>,
}

impl Client {
    pub fn bearer(token: String) -> Self {
        Self {
            bearer: Some(token),
            ..Default::default()
        }
    }

    pub fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = &self.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if !self.cookies.is_empty() {
            let header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, header);
        }
        builder
    }

    pub fn get(&self, uri: &str) -> Request<Body> {
        self.request(Method::GET, uri).body(Body::empty()).unwrap()
    }

    pub fn upload(&self, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        self.request(Method::POST, "/upload")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(field, file_name, data)))
            .unwrap()
    }

    /// Remember every cookie `response` sets, like a browser would.
    pub fn store_cookies(&mut self, response: &Response<Body>) {
        for (name, value) in set_cookies(response) {
            self.cookies.retain(|(existing, _)| existing != &name);
            self.cookies.push((name, value));
        }
    }
}

pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// (name, value) of every Set-Cookie header on `response`
pub fn set_cookies(response: &Response<Body>) -> Vec<(String, String)> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .filter_map(|header| header.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|(cookie, _)| cookie == name)
        .map(|(_, value)| value)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Entries under the storage root, excluding the staging area
pub fn stored_entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name != common::content::INCOMING_DIR)
        .collect();
    names.sort();
    names
}

pub fn staging_is_empty(root: &Path) -> bool {
    std::fs::read_dir(root.join(common::content::INCOMING_DIR))
        .unwrap()
        .next()
        .is_none()
}
