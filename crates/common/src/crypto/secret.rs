//! Symmetric session key derived from the shared server secret
//!
//! One 256-bit key serves both halves of cookie-session protection:
//! - **Cookie integrity**: HMAC-SHA256 tags over the session id carried in the cookie
//! - **At-rest confidentiality**: ChaCha20-Poly1305 encryption of the persisted session values
//!
//! The key is the SHA-256 digest of the configured signing secret, so every
//! process configured with the same secret can read the same session store.

use std::ops::Deref;

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of the derived key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("data too short for nonce")]
    Truncated,
    #[error("decrypt error")]
    Decrypt,
    #[error("encrypt error")]
    Encrypt,
    #[error("failed to generate random bytes: {0}")]
    Random(String),
    #[error("invalid mac key")]
    MacKey,
}

/// A 256-bit key used to authenticate cookies and encrypt session records
///
/// The encrypted format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Examples
///
/// ```
/// use common::crypto::SessionKey;
///
/// let key = SessionKey::derive(b"asdf1234");
/// let ciphertext = key.encrypt(b"session values").unwrap();
/// assert_eq!(key.decrypt(&ciphertext).unwrap(), b"session values");
/// ```
#[derive(PartialEq, Clone)]
pub struct SessionKey([u8; SECRET_SIZE]);

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

impl Deref for SessionKey {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for SessionKey {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        SessionKey(bytes)
    }
}

impl SessionKey {
    /// Derive the key from the shared server secret
    pub fn derive(secret: &[u8]) -> Self {
        let digest = Sha256::digest(secret);
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(&digest);
        Self(buff)
    }

    /// Get a reference to the key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, SecretError> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(self.bytes()).map_err(|_| SecretError::MacKey)?;
        mac.update(data);
        Ok(mac)
    }

    /// Compute the HMAC-SHA256 tag of `data`
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        Ok(self.mac(data)?.finalize().into_bytes().to_vec())
    }

    /// Check `tag` against `data` in constant time
    pub fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        self.mac(data)
            .map(|mac| mac.verify_slice(tag).is_ok())
            .unwrap_or(false)
    }

    /// Encrypt data using ChaCha20-Poly1305 AEAD with a fresh random nonce
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes).map_err(|e| SecretError::Random(e.to_string()))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| SecretError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Decrypt data produced by [`SessionKey::encrypt`]
    ///
    /// Fails if the input is too short or the authentication tag does not
    /// verify (tampered data or a different key).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE {
            return Err(SecretError::Truncated);
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| SecretError::Decrypt)
    }
}

/// Fill a buffer of `N` bytes from the OS RNG
pub fn random_bytes<const N: usize>() -> Result<[u8; N], SecretError> {
    let mut buff = [0u8; N];
    getrandom::getrandom(&mut buff).map_err(|e| SecretError::Random(e.to_string()))?;
    Ok(buff)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_derive_is_sha256_of_secret() {
        let key = SessionKey::derive(b"asdf1234");
        assert_eq!(key.bytes(), Sha256::digest(b"asdf1234").as_slice());
        assert_eq!(key, SessionKey::derive(b"asdf1234"));
        assert_ne!(key, SessionKey::derive(b"asdf12345"));
    }

    #[test]
    fn test_encrypt_decrypt() {
        let key = SessionKey::derive(b"secret");
        let data = b"hello world, this is a test message for encryption";

        let encrypted = key.encrypt(data).unwrap();
        let decrypted = key.decrypt(&encrypted).unwrap();

        assert_eq!(data.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let encrypted = SessionKey::derive(b"one").encrypt(b"values").unwrap();
        assert!(matches!(
            SessionKey::derive(b"two").decrypt(&encrypted),
            Err(SecretError::Decrypt)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = SessionKey::derive(b"secret");
        let mut encrypted = key.encrypt(b"test data for integrity check").unwrap();
        encrypted[NONCE_SIZE + 3] ^= 0xFF;
        assert!(key.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_truncated_input() {
        let key = SessionKey::derive(b"secret");
        assert!(matches!(key.decrypt(&[0u8; 4]), Err(SecretError::Truncated)));
    }

    #[test]
    fn test_sign_verify() {
        let key = SessionKey::derive(b"secret");
        let tag = key.sign(b"session:abcd").unwrap();
        assert!(key.verify(b"session:abcd", &tag));
        assert!(!key.verify(b"session:abce", &tag));
        assert!(!SessionKey::derive(b"other").verify(b"session:abcd", &tag));
    }
}
