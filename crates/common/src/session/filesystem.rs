use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use super::{Session, SessionError, SessionStore};
use crate::crypto::{random_bytes, SessionKey};

/// Prefix of every persisted session record
pub const SESSION_FILE_PREFIX: &str = "session_";

const SESSION_ID_BYTES: usize = 32;

/// What a record file decrypts to
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    /// Unix seconds of the last save
    saved_at: i64,
    values: BTreeMap<String, String>,
}

/// Session store keeping one encrypted file per session under a directory.
///
/// Cookie values have the form `<id>.<tag>` where `tag` is the base64url
/// HMAC-SHA256 of `<name>:<id>` under the store key. Record files hold the
/// JSON-encoded value bag, encrypted with the same key.
///
/// With a max age set, records not saved within it read as absent and
/// [`FilesystemSessionStore::purge_expired`] removes them from disk.
#[derive(Debug, Clone)]
pub struct FilesystemSessionStore {
    path: PathBuf,
    key: SessionKey,
    max_age: Option<Duration>,
}

impl FilesystemSessionStore {
    /// Open (creating if needed) a store rooted at `path`, keyed by the
    /// SHA-256 digest of `secret`.
    pub async fn new(path: impl Into<PathBuf>, secret: &[u8]) -> Result<Self, SessionError> {
        let path = path.into();
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self {
            path,
            key: SessionKey::derive(secret),
            max_age: None,
        })
    }

    /// Expire records that have not been saved for `max_age`.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Delete every record file last written more than `max_age` ago.
    ///
    /// Returns how many records were removed. A store without a max age
    /// keeps everything.
    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        let Some(max_age) = self.max_age else {
            return Ok(0);
        };
        let Some(cutoff) = SystemTime::now().checked_sub(max_age) else {
            return Ok(0);
        };

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let is_record = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(SESSION_FILE_PREFIX));
            if !is_record {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if modified < cutoff {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "purged expired sessions");
        }
        Ok(removed)
    }

    fn is_expired(&self, saved_at: i64) -> bool {
        self.max_age.is_some_and(|max_age| {
            let age = chrono::Utc::now().timestamp().saturating_sub(saved_at);
            age >= 0 && age as u64 > max_age.as_secs()
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh session with a newly generated random id.
    pub fn new_session(&self, name: &str) -> Result<Session, SessionError> {
        let id = hex::encode(random_bytes::<SESSION_ID_BYTES>()?);
        Ok(Session::new(name, id))
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.path.join(format!("{}{}", SESSION_FILE_PREFIX, id))
    }

    fn cookie_payload(name: &str, id: &str) -> Vec<u8> {
        format!("{}:{}", name, id).into_bytes()
    }

    fn encode_cookie(&self, name: &str, id: &str) -> Result<String, SessionError> {
        let tag = self.key.sign(&Self::cookie_payload(name, id))?;
        Ok(format!("{}.{}", id, URL_SAFE_NO_PAD.encode(tag)))
    }

    /// Extract the session id from an authenticated cookie value.
    fn decode_cookie(&self, name: &str, value: &str) -> Option<String> {
        let (id, tag) = value.split_once('.')?;
        if !is_session_id(id) {
            return None;
        }
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;
        self.key
            .verify(&Self::cookie_payload(name, id), &tag)
            .then(|| id.to_string())
    }

    async fn load(&self, id: &str) -> Result<BTreeMap<String, String>, SessionError> {
        let ciphertext = match tokio::fs::read(self.session_path(id)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::NotFound)
            }
            Err(e) => return Err(e.into()),
        };

        // A record we cannot read back (other key, corrupted) is as good as absent.
        let plaintext = match self.key.decrypt(&ciphertext) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(session = %id, "discarding undecryptable session record: {}", e);
                return Err(SessionError::NotFound);
            }
        };
        let stored: StoredSession = match serde_json::from_slice(&plaintext) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(session = %id, "discarding undecodable session record: {}", e);
                return Err(SessionError::NotFound);
            }
        };

        if self.is_expired(stored.saved_at) {
            tracing::debug!(session = %id, "session record expired");
            let _ = tokio::fs::remove_file(self.session_path(id)).await;
            return Err(SessionError::NotFound);
        }
        Ok(stored.values)
    }
}

fn is_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_BYTES * 2 && id.bytes().all(|b| b.is_ascii_hexdigit())
}

#[async_trait::async_trait]
impl SessionStore for FilesystemSessionStore {
    async fn get(&self, name: &str, cookie_value: Option<&str>) -> Result<Session, SessionError> {
        let Some(value) = cookie_value else {
            return self.new_session(name);
        };

        let Some(id) = self.decode_cookie(name, value) else {
            tracing::debug!(cookie = %name, "session cookie failed authentication, starting a new session");
            return self.new_session(name);
        };

        match self.load(&id).await {
            Ok(values) => Ok(Session::existing(name, id, values)),
            // The cookie is authentic, so keep its id for continuity.
            Err(SessionError::NotFound) => {
                tracing::debug!(session = %id, "no stored record for session cookie");
                Ok(Session::new(name, id))
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, session: &mut Session) -> Result<String, SessionError> {
        let stored = StoredSession {
            saved_at: chrono::Utc::now().timestamp(),
            values: session.values().clone(),
        };
        let plaintext = serde_json::to_vec(&stored)?;
        let ciphertext = self.key.encrypt(&plaintext)?;

        let final_path = self.session_path(session.id());
        let tmp_path = self.path.join(format!(
            ".{}{}.{}",
            SESSION_FILE_PREFIX,
            session.id(),
            uuid::Uuid::new_v4()
        ));
        tokio::fs::write(&tmp_path, &ciphertext).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        session.mark_saved();
        self.encode_cookie(session.name(), session.id())
    }
}
