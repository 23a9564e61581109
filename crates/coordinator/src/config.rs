//! Configuration types for the coordinator

use mediagrid_layout::{ContainerSize, LayoutConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Floor for both reorder cadences, milliseconds
pub const MIN_INTERVAL_MS: u64 = 10;

/// Main configuration for the coordinator
///
/// Supplied by the session-configuration collaborator at initialization;
/// intervals and layout fields may be updated at runtime via setters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Layout configuration passed through to the core
    pub layout: LayoutConfig,

    /// Fast cadence: delay before a pass triggered by a local action
    /// (default: 100ms)
    pub fast_interval_ms: u64,

    /// Slow cadence: passive reconciliation interval for remote events
    /// (default: 1000ms)
    pub slow_interval_ms: u64,

    /// Initial rendering container size
    pub container: ContainerSize,

    /// Session id carried in outbound active-state updates
    /// (auto-generated if None)
    pub session_id: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            fast_interval_ms: 100,
            slow_interval_ms: 1000,
            container: ContainerSize::default(),
            session_id: None,
        }
    }
}

impl CoordinatorConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - either interval is below [`MIN_INTERVAL_MS`]
    /// - the fast interval exceeds the slow interval
    /// - the layout configuration is invalid
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.fast_interval_ms < MIN_INTERVAL_MS {
            return Err(Error::InvalidConfig(format!(
                "fast_interval_ms must be at least {}, got {}",
                MIN_INTERVAL_MS, self.fast_interval_ms
            )));
        }

        if self.slow_interval_ms < MIN_INTERVAL_MS {
            return Err(Error::InvalidConfig(format!(
                "slow_interval_ms must be at least {}, got {}",
                MIN_INTERVAL_MS, self.slow_interval_ms
            )));
        }

        if self.fast_interval_ms > self.slow_interval_ms {
            return Err(Error::InvalidConfig(format!(
                "fast_interval_ms ({}) must not exceed slow_interval_ms ({})",
                self.fast_interval_ms, self.slow_interval_ms
            )));
        }

        self.layout.validate()?;

        Ok(())
    }

    /// Return a copy with degenerate values clamped to safe minimums
    pub fn clamped(&self) -> Self {
        let mut out = self.clone();

        if out.fast_interval_ms < MIN_INTERVAL_MS {
            warn!(
                fast_interval_ms = out.fast_interval_ms,
                "fast interval clamped to minimum"
            );
            out.fast_interval_ms = MIN_INTERVAL_MS;
        }

        if out.slow_interval_ms < out.fast_interval_ms {
            warn!(
                slow_interval_ms = out.slow_interval_ms,
                "slow interval clamped to fast interval"
            );
            out.slow_interval_ms = out.fast_interval_ms;
        }

        out.layout = out.layout.clamped();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_interval_floor_fails() {
        let mut config = CoordinatorConfig::default();
        config.fast_interval_ms = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fast_exceeding_slow_fails() {
        let mut config = CoordinatorConfig::default();
        config.fast_interval_ms = 2000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_layout_propagates() {
        let mut config = CoordinatorConfig::default();
        config.layout.item_page_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamped_restores_validity() {
        let mut config = CoordinatorConfig::default();
        config.fast_interval_ms = 1;
        config.slow_interval_ms = 5;
        config.layout.screen_page_limit = 0;

        let clamped = config.clamped();
        assert!(clamped.validate().is_ok());
        assert_eq!(clamped.fast_interval_ms, MIN_INTERVAL_MS);
    }

    #[test]
    fn test_config_serialization() {
        let config = CoordinatorConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: CoordinatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.fast_interval_ms, deserialized.fast_interval_ms);
    }
}
