//! # Global engine configuration.
//!
//! Provides [`EngineConfig`], the centralized settings for the engine.
//!
//! ## Sentinel values
//! - `liveness_timeout = 0s` → watchdog disabled (treated as `None` by
//!   [`EngineConfig::liveness_bound`]); the default is an explicit 1s,
//!   never an implicit zero.
//! - `bus_capacity` is clamped to a minimum of 1 by the bus.

use std::time::Duration;

/// Global configuration for the execution engine.
///
/// ## Field semantics
/// - `liveness_timeout`: wall-clock bound the watchdog applies to each task's
///   program invocation (`0s` = no watchdog)
/// - `bus_capacity`: observability bus ring buffer size (min 1)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to
/// avoid sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum wall-clock time one task's program invocation may run without
    /// returning before the execution is declared stuck.
    ///
    /// Scoped to a single task, not to the execution's overall lifetime.
    /// On expiry the execution is marked `Failed` with a liveness-violation
    /// error and no further tasks are scheduled.
    ///
    /// `Duration::ZERO` disables the watchdog.
    pub liveness_timeout: Duration,

    /// Capacity of the observability bus broadcast ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items. Minimum value is 1.
    pub bus_capacity: usize,
}

impl EngineConfig {
    /// Returns the watchdog bound as an `Option`.
    ///
    /// - `None` → watchdog disabled
    /// - `Some(d)` → each task invocation is bounded by `d`
    #[inline]
    pub fn liveness_bound(&self) -> Option<Duration> {
        if self.liveness_timeout == Duration::ZERO {
            None
        } else {
            Some(self.liveness_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `liveness_timeout = 1s` (explicit, matching the engine's default
    ///   deadlock-detection bound; never an implicit zero)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            liveness_timeout: Duration::from_secs(1),
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_liveness_timeout_is_explicit_nonzero() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.liveness_timeout, Duration::from_secs(1));
        assert_eq!(cfg.liveness_bound(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_zero_timeout_disables_watchdog() {
        let cfg = EngineConfig {
            liveness_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.liveness_bound(), None);
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = EngineConfig {
            bus_capacity: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
