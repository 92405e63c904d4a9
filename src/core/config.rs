//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`], the settings consumed (never parsed) by the
//! supervisor, and [`SignalHandling`], which selects the signal trigger mode.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **Registration defaults**: a [`ResourceSpec`](crate::ResourceSpec) without
//!    an explicit timeout resolves to [`SupervisorConfig::default_timeout`].

use std::time::Duration;

use crate::core::shutdown::Signal;

/// Which termination signals the signal trigger handles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SignalHandling {
    /// No signal trigger.
    Disabled,
    /// `SIGINT` + `SIGTERM`.
    #[default]
    Default,
    /// An explicit signal list.
    Custom(Vec<Signal>),
}

impl SignalHandling {
    /// Resolves the mode to the concrete signal list (`None` = disabled).
    pub fn signals(&self) -> Option<Vec<Signal>> {
        match self {
            SignalHandling::Disabled => None,
            SignalHandling::Default => Some(Signal::DEFAULT_SET.to_vec()),
            SignalHandling::Custom(list) => Some(list.clone()),
        }
    }
}

/// Global configuration for the supervisor.
///
/// ## Field semantics
/// - `default_timeout`: stop timeout for resources registered without one
/// - `handle_signals`: signal trigger mode
/// - `handle_uncaught_errors`: install the fault trigger
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Stop timeout applied when a spec carries none.
    pub default_timeout: Duration,

    /// Signal trigger mode.
    pub handle_signals: SignalHandling,

    /// Whether the fault trigger is installed.
    pub handle_uncaught_errors: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Config with both triggers disabled; useful for embedding and tests.
    pub fn without_triggers() -> Self {
        Self {
            handle_signals: SignalHandling::Disabled,
            handle_uncaught_errors: false,
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `default_timeout = 5s`
    /// - `handle_signals = SignalHandling::Default` (SIGINT + SIGTERM)
    /// - `handle_uncaught_errors = true`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_millis(5000),
            handle_signals: SignalHandling::Default,
            handle_uncaught_errors: true,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.default_timeout, Duration::from_secs(5));
        assert!(cfg.handle_uncaught_errors);
        assert_eq!(
            cfg.handle_signals.signals(),
            Some(vec![Signal::Interrupt, Signal::Terminate])
        );
    }

    #[test]
    fn test_signal_modes() {
        assert_eq!(SignalHandling::Disabled.signals(), None);
        assert_eq!(
            SignalHandling::Custom(vec![Signal::Hangup]).signals(),
            Some(vec![Signal::Hangup])
        );
    }

    #[test]
    fn test_without_triggers() {
        let cfg = SupervisorConfig::without_triggers();
        assert_eq!(cfg.handle_signals, SignalHandling::Disabled);
        assert!(!cfg.handle_uncaught_errors);
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }
}
