//! Player configuration

use serde::{Deserialize, Serialize};

/// Free preview length used when nothing else is configured
pub const DEFAULT_FREE_PREVIEW_SECS: f64 = 30.0;

/// Playback gate configuration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Seconds of every video a non-entitled viewer may watch
    #[serde(default = "default_free_preview_secs")]
    pub free_preview_secs: f64,
}

const fn default_free_preview_secs() -> f64 {
    DEFAULT_FREE_PREVIEW_SECS
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            free_preview_secs: DEFAULT_FREE_PREVIEW_SECS,
        }
    }
}

impl PlayerConfig {
    pub const fn new(free_preview_secs: f64) -> Self {
        Self { free_preview_secs }
    }

    /// Load from `COURSE_FREE_PREVIEW_SECS`, falling back to the default.
    pub fn from_env() -> Self {
        let free_preview_secs = match std::env::var("COURSE_FREE_PREVIEW_SECS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "Ignoring unparsable COURSE_FREE_PREVIEW_SECS");
                DEFAULT_FREE_PREVIEW_SECS
            }),
            Err(_) => DEFAULT_FREE_PREVIEW_SECS,
        };

        Self { free_preview_secs }
    }

    /// Threshold handed to the gate: entitled viewers get no limit at all.
    pub const fn threshold_for(&self, entitled: bool) -> f64 {
        if entitled {
            f64::INFINITY
        } else {
            self.free_preview_secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_for_entitled_is_unbounded() {
        let config = PlayerConfig::default();
        assert!(config.threshold_for(true).is_infinite());
        assert!((config.threshold_for(false) - 30.0).abs() < f64::EPSILON);
    }
}
