/**
 * Content-addressed file storage.
 *  Objects are named by the xxh64 hash of their
 *  bytes and kept next to a NAME sidecar.
 */
pub mod content;
/**
 * Cryptographic primitives for cookie sessions.
 *  - Cookie authentication
 *  - Encryption of session records at rest
 */
pub mod crypto;
/**
 * Durable cookie sessions, and the filesystem
 *  backed store the daemon uses.
 */
pub mod session;
/**
 * Signed, expiring bearer tokens.
 */
pub mod token;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::content::{ContentError, ContentRecord, ContentStore, Uid};
    pub use crate::session::{FilesystemSessionStore, Session, SessionError, SessionStore};
    pub use crate::token::{Claims, TokenCodec, TokenError};
    pub use crate::version::build_info;
}
