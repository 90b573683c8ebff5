//! `From` implementations bridging `trough_config` types to `trough_core` types.

use std::time::Duration;

use crate::catalog::{Catalog, CoilEntry, SwitchEntry, TroughWiring};
use crate::config::{RetryPolicy, TimingCfg};

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&trough_config::Timing> for TimingCfg {
    fn from(c: &trough_config::Timing) -> Self {
        Self {
            settle: Duration::from_millis(c.settle_ms),
            shooter_inactivity: Duration::from_millis(c.shooter_inactivity_ms),
            autoplunge_settle: Duration::from_millis(c.autoplunge_settle_ms),
            eject_watch: Duration::from_millis(c.eject_watch_ms),
            recheck: Duration::from_millis(c.recheck_ms),
            lane_busy_retry: Duration::from_millis(c.lane_busy_retry_ms),
            outhole_settle: Duration::from_millis(c.outhole_settle_ms),
            jam_settle: Duration::from_millis(c.jam_settle_ms),
            jam_pulse_margin_ms: c.jam_pulse_margin_ms,
            status_log: (c.status_log_ms > 0).then(|| Duration::from_millis(c.status_log_ms)),
            ..Self::default()
        }
    }
}

// ── RetryPolicy ──────────────────────────────────────────────────────────────

impl From<&trough_config::Retry> for RetryPolicy {
    fn from(c: &trough_config::Retry) -> Self {
        Self {
            max_retries: c.max_eject_retries,
        }
    }
}

// ── TroughWiring ─────────────────────────────────────────────────────────────

impl From<&trough_config::TroughSection> for TroughWiring {
    fn from(c: &trough_config::TroughSection) -> Self {
        let wiring = TroughWiring::new(
            c.position_switches.iter().cloned(),
            &c.eject_switch,
            &c.eject_coil,
            &c.shooter_lane_switch,
        )
        .with_early_save_switches(c.early_save_switches.iter().cloned());
        match &c.plunge_coil {
            Some(p) => wiring.with_plunge_coil(p),
            None => wiring,
        }
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

impl From<&trough_config::Config> for Catalog {
    fn from(c: &trough_config::Config) -> Self {
        let mut cat = Catalog::new();
        for sw in &c.switches {
            cat.push_switch(SwitchEntry {
                name: sw.name.clone(),
                tags: sw.tags.clone(),
            });
        }
        for coil in &c.coils {
            cat.push_coil(CoilEntry {
                name: coil.name.clone(),
                pulse_ms: coil.pulse_ms,
                tags: coil.tags.clone(),
            });
        }
        cat
    }
}
