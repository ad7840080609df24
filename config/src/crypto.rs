//! At-rest protection for the remote service credential.
//!
//! Uses AES-256-GCM with a key derived from the hostname and username, so a
//! copied settings file is useless on another machine.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

const NONCE_SIZE: usize = 12;

fn derive_key() -> [u8; 32] {
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "unknown".to_string());
    let username = whoami::username();

    let mut hasher = Sha256::new();
    hasher.update(b"lensfolio-remote-credential-v1");
    hasher.update(hostname.as_bytes());
    hasher.update(b":");
    hasher.update(username.as_bytes());

    let mut key = [0u8; 32];
    key.copy_from_slice(&hasher.finalize());
    key
}

/// Encrypt a credential. The output is base64 of `nonce || ciphertext`.
pub fn encrypt_credential(plaintext: &str) -> Result<String, String> {
    let cipher = Aes256Gcm::new_from_slice(&derive_key())
        .map_err(|e| format!("Failed to create cipher: {}", e))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| format!("Encryption failed: {}", e))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(&sealed))
}

/// Decrypt the output of [`encrypt_credential`].
pub fn decrypt_credential(sealed: &str) -> Result<String, String> {
    let cipher = Aes256Gcm::new_from_slice(&derive_key())
        .map_err(|e| format!("Failed to create cipher: {}", e))?;

    let bytes = BASE64
        .decode(sealed)
        .map_err(|e| format!("Failed to decode base64: {}", e))?;
    if bytes.len() < NONCE_SIZE {
        return Err("Sealed credential too short".to_string());
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| format!("Decryption failed: {}", e))?;

    String::from_utf8(plaintext).map_err(|e| format!("Invalid UTF-8 in credential: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_roundtrip() {
        let key = "eyJhbGciOiJIUzI1NiJ9.anon";
        let sealed = encrypt_credential(key).expect("encryption failed");
        assert_ne!(sealed, key);
        assert_eq!(decrypt_credential(&sealed).expect("decryption failed"), key);
    }

    #[test]
    fn test_nonce_differs_between_calls() {
        let first = encrypt_credential("anon").expect("encryption failed");
        let second = encrypt_credential("anon").expect("encryption failed");
        assert_ne!(first, second);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decrypt_credential("not-valid-base64!!!").is_err());
        assert!(decrypt_credential(&BASE64.encode(b"short")).is_err());
    }
}
