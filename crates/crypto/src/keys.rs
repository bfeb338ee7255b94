use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use kronos_core::PublicKey;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid public key encoding")]
    InvalidEncoding,
    #[error("Invalid public key length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Per-node layer key material (X25519)
///
/// Generated fresh at process start and never persisted. Only the public
/// half is ever handed out; the secret stays inside the relay that peels.
pub struct NodeKeypair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl Clone for NodeKeypair {
    fn clone(&self) -> Self {
        Self::from_secret_bytes(self.secret.as_bytes())
    }
}

impl std::fmt::Debug for NodeKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeypair")
            .field("public", &self.public_key_base64())
            .finish_non_exhaustive()
    }
}

impl NodeKeypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Create from raw secret key bytes
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        let secret = StaticSecret::from(*secret);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Get the public key as bytes
    pub fn public_key_bytes(&self) -> PublicKey {
        self.public.to_bytes()
    }

    /// Public key in the base64 form served by `GET /public-key`
    pub fn public_key_base64(&self) -> String {
        encode_public_key(&self.public_key_bytes())
    }

    /// Perform Diffie-Hellman key exchange.
    ///
    /// Returns `None` when the peer key is a low-order point and the result
    /// would not depend on our secret.
    pub fn diffie_hellman(&self, their_public: &PublicKey) -> Option<[u8; 32]> {
        let shared = self.secret.diffie_hellman(&X25519PublicKey::from(*their_public));
        if shared.was_contributory() {
            Some(*shared.as_bytes())
        } else {
            None
        }
    }
}

pub fn encode_public_key(key: &PublicKey) -> String {
    BASE64.encode(key)
}

pub fn decode_public_key(encoded: &str) -> Result<PublicKey, KeyError> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|_| KeyError::InvalidEncoding)?;
    let len = bytes.len();
    bytes.try_into().map_err(|_| KeyError::InvalidLength(len))
}

/// Hash data using SHA-256
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
