//! Durable cookie sessions.
//!
//! A session is an opaque id plus a string key/value bag. The client holds
//! only an authenticated reference to the id (the cookie value); the values
//! live server side in a [`SessionStore`].

use std::collections::BTreeMap;

mod filesystem;

pub use filesystem::FilesystemSessionStore;

/// A server-side session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
    id: String,
    values: BTreeMap<String, String>,
    is_new: bool,
}

impl Session {
    /// A fresh, never-persisted session with the given id.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            values: BTreeMap::new(),
            is_new: true,
        }
    }

    pub(crate) fn existing(
        name: impl Into<String>,
        id: impl Into<String>,
        values: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            values,
            is_new: false,
        }
    }

    /// Cookie name this session is addressed by
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// True until the session has been saved once
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub(crate) fn mark_saved(&mut self) {
        self.is_new = false;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No record exists for the presented cookie; callers create a new session.
    #[error("session not found")]
    NotFound,
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encoding error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("session crypto error: {0}")]
    Crypto(#[from] crate::crypto::SecretError),
}

impl SessionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound)
    }
}

/// Persistence for cookie sessions.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up the session named `name` referenced by `cookie_value`.
    ///
    /// Returns the stored session when the cookie authenticates and a record
    /// exists, otherwise a fresh session (`is_new() == true`). Only genuine
    /// storage failures are returned as errors.
    async fn get(&self, name: &str, cookie_value: Option<&str>) -> Result<Session, SessionError>;

    /// Persist `session` and return the cookie value that references it.
    async fn save(&self, session: &mut Session) -> Result<String, SessionError>;
}
