//! Share link token generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Generates share link tokens.
#[derive(Debug, Clone)]
pub struct ShareTokenGenerator {
    token_bytes: usize,
}

impl ShareTokenGenerator {
    /// Creates a generator producing tokens from `token_bytes` random bytes.
    pub fn new(token_bytes: usize) -> Self {
        Self {
            token_bytes: token_bytes.max(16),
        }
    }

    /// Generates a cryptographically secure, URL-safe token.
    pub fn generate_token(&self) -> String {
        let mut bytes = vec![0u8; self.token_bytes];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl Default for ShareTokenGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}
