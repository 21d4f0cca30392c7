use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use std::path::{Path, PathBuf};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,
}

/// Encrypt an uploaded file at rest with AES-256-GCM.
///
/// Writes `{path}.enc` with the random nonce prefixed to the ciphertext and
/// returns the encrypted path plus the one-time key. Deleting the plaintext
/// is the caller's responsibility (it happens in the intake's scoped cleanup
/// whether or not encryption succeeded).
pub fn encrypt_at_rest(path: &Path) -> Result<(PathBuf, [u8; 32]), CryptoError> {
    let plaintext = std::fs::read(path)?;

    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::Encrypt)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
        .map_err(|_| CryptoError::Encrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);

    let encrypted_path = PathBuf::from(format!("{}.enc", path.display()));
    std::fs::write(&encrypted_path, out)?;

    Ok((encrypted_path, key))
}

/// Inverse of [`encrypt_at_rest`], for operators recovering a stored file.
pub fn decrypt_file(path: &Path, key: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    let data = std::fs::read(path)?;
    if data.len() < NONCE_LEN {
        return Err(CryptoError::Decrypt);
    }
    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Decrypt)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CryptoError::Decrypt)
}
