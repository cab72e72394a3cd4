//! # Dispatcher configuration.
//!
//! Provides [`DispatcherConfig`] centralized settings for one dispatcher instance.
//!
//! ## Sentinel values
//! - `depth_warning = 0` → no queue-depth warnings

use std::borrow::Cow;

/// Per-instance configuration.
///
/// ## Field semantics
/// - `name`: instance tag attached to every log line and error (`"dispatcher"` by default)
/// - `auto_start`: start the worker from [`DispatcherBuilder::build`](crate::DispatcherBuilder::build)
/// - `depth_warning`: warn each time the pending depth reaches a multiple of this value (`0` = off)
///
/// ## Notes
/// The queue is unbounded. Sustained overload grows memory without limit;
/// `depth_warning` only makes that visible.
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Instance name used in logs and errors.
    pub name: Cow<'static, str>,

    /// Start the worker as soon as the dispatcher is built.
    ///
    /// [`Dispatcher::new`](crate::Dispatcher::new) ignores this flag and is always inert.
    pub auto_start: bool,

    /// Queue depth step at which a warning is logged.
    ///
    /// - `0` = disabled
    /// - `n > 0` = warn at depth `n`, `2n`, `3n`, ...
    pub depth_warning: usize,
}

impl DispatcherConfig {
    /// Creates a default configuration with the given instance name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns the depth warning step as an `Option`.
    ///
    /// - `None` → warnings disabled
    /// - `Some(n)` → warn at every multiple of `n`
    #[inline]
    pub fn depth_warning_threshold(&self) -> Option<usize> {
        if self.depth_warning == 0 {
            None
        } else {
            Some(self.depth_warning)
        }
    }
}

impl Default for DispatcherConfig {
    /// Default configuration:
    ///
    /// - `name = "dispatcher"`
    /// - `auto_start = false` (explicit `start()` required)
    /// - `depth_warning = 0` (disabled)
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("dispatcher"),
            auto_start: false,
            depth_warning: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_inert_and_quiet() {
        let cfg = DispatcherConfig::default();
        assert_eq!(cfg.name, "dispatcher");
        assert!(!cfg.auto_start);
        assert_eq!(cfg.depth_warning_threshold(), None);
    }

    #[test]
    fn named_keeps_other_defaults() {
        let mut cfg = DispatcherConfig::named("orders");
        cfg.depth_warning = 500;
        assert_eq!(cfg.name, "orders");
        assert_eq!(cfg.depth_warning_threshold(), Some(500));
    }
}
