//! Event bus configuration.

use serde::{Deserialize, Serialize};

/// In-process event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Broadcast channel capacity; slow subscribers past this lag and skip.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_buffer_size() -> usize {
    256
}
