use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use kronos_core::PublicKey;

use crate::keys::{hash, NodeKeypair};

const EPHEMERAL_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Smallest possible sealed blob: ephemeral key, nonce, and tag over an
/// empty plaintext
pub const SEALED_OVERHEAD: usize = EPHEMERAL_LEN + NONCE_LEN + TAG_LEN;

#[derive(Error, Debug)]
pub enum EncryptError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed")]
    DecryptionFailed,
    #[error("Invalid key")]
    InvalidKey,
    #[error("Ciphertext too short")]
    CiphertextTooShort,
}

/// Symmetric key for one sealed layer: SHA-256 over the shared secret and
/// both public keys, so a layer is bound to the node it was sealed for.
fn layer_key(shared: &[u8; 32], ephemeral: &PublicKey, recipient: &PublicKey) -> [u8; 32] {
    let mut input = Vec::with_capacity(32 * 3);
    input.extend_from_slice(shared);
    input.extend_from_slice(ephemeral);
    input.extend_from_slice(recipient);
    hash(&input)
}

/// Seal data for a node using ephemeral ECDH + ChaCha20-Poly1305
///
/// Output: `[ephemeral_pubkey: 32][nonce: 12][ciphertext + tag]`
pub fn seal_for_node(recipient_pubkey: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EncryptError> {
    let ephemeral = NodeKeypair::generate();
    let ephemeral_pubkey = ephemeral.public_key_bytes();
    let shared = ephemeral
        .diffie_hellman(recipient_pubkey)
        .ok_or(EncryptError::InvalidKey)?;
    let key = layer_key(&shared, &ephemeral_pubkey, recipient_pubkey);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EncryptError::InvalidKey)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| EncryptError::EncryptionFailed)?;

    let mut result = Vec::with_capacity(EPHEMERAL_LEN + NONCE_LEN + ciphertext.len());
    result.extend_from_slice(&ephemeral_pubkey);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Open a blob sealed with [`seal_for_node`] using the node's own keypair
pub fn open_sealed(keypair: &NodeKeypair, sealed: &[u8]) -> Result<Vec<u8>, EncryptError> {
    if sealed.len() < SEALED_OVERHEAD {
        return Err(EncryptError::CiphertextTooShort);
    }

    let (ephemeral_pubkey, rest) = sealed.split_at(EPHEMERAL_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
    let ephemeral_pubkey: PublicKey = ephemeral_pubkey
        .try_into()
        .map_err(|_| EncryptError::InvalidKey)?;

    let shared = keypair
        .diffie_hellman(&ephemeral_pubkey)
        .ok_or(EncryptError::DecryptionFailed)?;
    let key = layer_key(&shared, &ephemeral_pubkey, &keypair.public_key_bytes());

    let cipher = ChaCha20Poly1305::new_from_slice(&key).map_err(|_| EncryptError::InvalidKey)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| EncryptError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let node = NodeKeypair::generate();
        let plaintext = b"Hello, Kronos!";

        let sealed = seal_for_node(&node.public_key_bytes(), plaintext).unwrap();
        let opened = open_sealed(&node, &sealed).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_wrong_node_cannot_open() {
        let node = NodeKeypair::generate();
        let other = NodeKeypair::generate();

        let sealed = seal_for_node(&node.public_key_bytes(), b"secret").unwrap();
        let result = open_sealed(&other, &sealed);

        assert!(matches!(result, Err(EncryptError::DecryptionFailed)));
    }

    #[test]
    fn test_fresh_ephemeral_per_seal() {
        let node = NodeKeypair::generate();

        let a = seal_for_node(&node.public_key_bytes(), b"same").unwrap();
        let b = seal_for_node(&node.public_key_bytes(), b"same").unwrap();

        assert_ne!(a[..EPHEMERAL_LEN], b[..EPHEMERAL_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sealed_size() {
        let node = NodeKeypair::generate();
        let sealed = seal_for_node(&node.public_key_bytes(), b"test").unwrap();
        assert_eq!(sealed.len(), SEALED_OVERHEAD + 4);
    }

    #[test]
    fn test_seal_empty_plaintext() {
        let node = NodeKeypair::generate();
        let sealed = seal_for_node(&node.public_key_bytes(), b"").unwrap();
        assert!(open_sealed(&node, &sealed).unwrap().is_empty());
    }

    // ==================== NEGATIVE TESTS ====================

    #[test]
    fn test_open_too_short() {
        let node = NodeKeypair::generate();
        let result = open_sealed(&node, &[1, 2, 3, 4, 5]);
        assert!(matches!(result, Err(EncryptError::CiphertextTooShort)));
    }

    #[test]
    fn test_open_empty() {
        let node = NodeKeypair::generate();
        assert!(matches!(open_sealed(&node, &[]), Err(EncryptError::CiphertextTooShort)));
    }

    #[test]
    fn test_open_corrupted_ciphertext() {
        let node = NodeKeypair::generate();
        let mut sealed = seal_for_node(&node.public_key_bytes(), b"Secret data").unwrap();

        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;

        assert!(matches!(open_sealed(&node, &sealed), Err(EncryptError::DecryptionFailed)));
    }

    #[test]
    fn test_open_corrupted_ephemeral_key() {
        let node = NodeKeypair::generate();
        let mut sealed = seal_for_node(&node.public_key_bytes(), b"Secret data").unwrap();

        sealed[0] ^= 0x01;

        assert!(matches!(open_sealed(&node, &sealed), Err(EncryptError::DecryptionFailed)));
    }

    #[test]
    fn test_seal_to_low_order_point_fails() {
        assert!(matches!(seal_for_node(&[0u8; 32], b"x"), Err(EncryptError::InvalidKey)));
    }
}
