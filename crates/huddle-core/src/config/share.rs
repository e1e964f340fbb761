//! Share link configuration.

use serde::{Deserialize, Serialize};

/// Public share link policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Number of random bytes in a share token.
    #[serde(default = "default_token_bytes")]
    pub token_bytes: usize,
    /// Longest allowed lifetime of a share link in days (0 = unlimited).
    #[serde(default = "default_max_expiry_days")]
    pub max_expiry_days: u32,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            token_bytes: default_token_bytes(),
            max_expiry_days: default_max_expiry_days(),
        }
    }
}

fn default_token_bytes() -> usize {
    32
}

fn default_max_expiry_days() -> u32 {
    30
}
