//! Engine tuning knobs.
//!
//! Defaults match the original walkthrough behavior: 500ms validation
//! polling and a 3s advance for timer-only steps. Serde support lets hosts
//! carry these inside their own config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between evaluations of pollable validations.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Advance delay for auto-advance steps that carry no validation.
    #[serde(default = "default_auto_advance_delay_ms")]
    pub auto_advance_delay_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_auto_advance_delay_ms() -> u64 {
    3000 // 3 seconds
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            auto_advance_delay_ms: default_auto_advance_delay_ms(),
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }
}
