use std::time::Duration;

use thiserror::Error;

/// Runtime configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the tick thread checks triggers.
    pub tick_interval: Duration,
    /// Join in-flight print runs before [`crate::SchedulerHandle::shutdown`] returns.
    pub wait_for_running: bool,
    /// Overrides the paper width derived from the printer settings.
    pub line_width: Option<usize>,
    /// Name of the tick thread, for logging.
    pub name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            wait_for_running: true,
            line_width: None,
            name: "print-scheduler".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_wait_for_running(mut self, wait: bool) -> Self {
        self.wait_for_running = wait;
        self
    }

    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = Some(width);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A configuration value that was present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
