//! Activation tokens: a random plaintext handed to the user and the SHA-256
//! digest that is the only form ever written to the database.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteToken {
    /// Goes into the activation link, never into storage.
    pub plaintext: String,
    /// Lowercase hex SHA-256 of `plaintext`.
    pub digest: String,
}

/// Generates a fresh token: 256 bits from the OS RNG, hex encoded.
pub fn generate() -> InviteToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let digest = digest(&plaintext);
    InviteToken { plaintext, digest }
}

pub fn digest(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hex::encode(hasher.finalize())
}
