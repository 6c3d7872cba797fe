//! Cryptographic primitives for cookie sessions
//!
//! Everything here hangs off a single [`SessionKey`], the SHA-256 digest of
//! the server's shared signing secret:
//!
//! - cookie values are authenticated with HMAC-SHA256 under the key
//! - persisted session records are encrypted with ChaCha20-Poly1305 under the key
//!
//! Token signing lives in [`crate::token`] and uses the raw secret, as JWT
//! HMAC verification expects.

mod secret;

pub use secret::{random_bytes, SecretError, SessionKey, NONCE_SIZE, SECRET_SIZE};
