//! Runtime configuration for the trough controller.
//!
//! These are the structs the controller runs on. They are separate from the
//! TOML-deserialized config in `trough_config`; see `conversions`.

use std::time::Duration;

/// Every delay the controller schedules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingCfg {
    /// Quiet time on the position switches before the ball count is evaluated.
    pub settle: Duration,
    /// The shooter lane must be empty this long before the next feed.
    pub shooter_inactivity: Duration,
    /// A ball must rest in the shooter lane this long to count as fed.
    pub autoplunge_settle: Duration,
    /// Eject watchdog period.
    pub eject_watch: Duration,
    /// Re-count delay after a multi-drain or a short count during ball save.
    pub recheck: Duration,
    /// Launch retry while the shooter lane switch is still active.
    pub lane_busy_retry: Duration,
    /// Added to the remaining lane wait so the retry lands after the threshold.
    pub lane_epsilon: Duration,
    pub outhole_settle: Duration,
    pub jam_settle: Duration,
    /// Subtracted from the eject coil's default pulse when clearing a jam.
    pub jam_pulse_margin_ms: u32,
    /// Periodic status log; `None` disables it.
    pub status_log: Option<Duration>,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(500),
            shooter_inactivity: Duration::from_millis(2000),
            autoplunge_settle: Duration::from_millis(300),
            eject_watch: Duration::from_secs(4),
            recheck: Duration::from_secs(1),
            lane_busy_retry: Duration::from_secs(1),
            lane_epsilon: Duration::from_millis(1),
            outhole_settle: Duration::from_millis(300),
            jam_settle: Duration::from_secs(2),
            jam_pulse_margin_ms: 5,
            status_log: None,
        }
    }
}

/// What the eject watchdog does when a fed ball never shows up in the lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    pub fn bounded(max_retries: u32) -> Self {
        Self {
            max_retries: Some(max_retries),
        }
    }

    /// Whether another re-pulse is allowed after `done` retries.
    #[inline]
    pub fn allows(&self, done: u32) -> bool {
        self.max_retries.is_none_or(|max| done < max)
    }
}
