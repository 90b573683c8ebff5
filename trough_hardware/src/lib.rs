//! Simulated machine hardware: a switch matrix, a coil bank and a game
//! context. Handles are cheap clones over shared state so a simulator can
//! flip switches while the controller owns its own copy.

pub mod error;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use trough_traits::{Clock, Coils, GameContext, HwResult, Switches};

use crate::error::{HwError, Result};

#[derive(Debug, Clone, Copy)]
struct SwitchState {
    active: bool,
    // None until the first transition after registration
    changed_at: Option<Instant>,
}

/// Simulated switch matrix with per-switch change timestamps.
#[derive(Clone)]
pub struct SimSwitches {
    inner: Arc<Mutex<HashMap<String, SwitchState>>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimSwitches {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Register a switch with its power-on state. Re-registering resets it.
    pub fn with_switch(self, name: &str, active: bool) -> Self {
        self.register(name, active);
        self
    }

    pub fn register(&self, name: &str, active: bool) {
        if let Ok(mut map) = self.inner.lock() {
            map.insert(
                name.to_string(),
                SwitchState {
                    active,
                    changed_at: None,
                },
            );
        }
    }

    /// Drive a switch to `active`. Returns whether the state actually changed.
    pub fn set(&self, name: &str, active: bool) -> Result<bool> {
        let now = self.clock.now();
        let mut map = self
            .inner
            .lock()
            .map_err(|_| HwError::Poisoned("switch matrix"))?;
        let st = map
            .get_mut(name)
            .ok_or_else(|| HwError::UnknownSwitch(name.to_string()))?;
        if st.active == active {
            return Ok(false);
        }
        st.active = active;
        st.changed_at = Some(now);
        tracing::trace!(switch = name, active, "switch changed");
        Ok(true)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn state(&self, name: &str) -> Option<SwitchState> {
        self.inner.lock().ok().and_then(|m| m.get(name).copied())
    }
}

impl Switches for SimSwitches {
    fn is_active(&self, name: &str) -> bool {
        self.state(name).is_some_and(|s| s.active)
    }

    fn time_since_change(&self, name: &str) -> Duration {
        match self.state(name).and_then(|s| s.changed_at) {
            Some(at) => self.clock.since(at),
            // Never changed: treat as settled forever.
            None => Duration::MAX,
        }
    }
}

/// One recorded coil activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseRecord {
    pub coil: String,
    pub duration_ms: u32,
    pub at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct CoilState {
    default_ms: u32,
    enabled: bool,
}

#[derive(Debug, Default)]
struct CoilBank {
    coils: HashMap<String, CoilState>,
    log: Vec<PulseRecord>,
}

/// Simulated coil drivers that record every pulse.
#[derive(Clone)]
pub struct SimCoils {
    inner: Arc<Mutex<CoilBank>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimCoils {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CoilBank::default())),
            clock,
        }
    }

    pub fn with_coil(self, name: &str, default_ms: u32) -> Self {
        if let Ok(mut bank) = self.inner.lock() {
            bank.coils.insert(
                name.to_string(),
                CoilState {
                    default_ms,
                    enabled: true,
                },
            );
        }
        self
    }

    /// Disable a coil so pulses fail, as a blown fuse would.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut bank = self
            .inner
            .lock()
            .map_err(|_| HwError::Poisoned("coil bank"))?;
        let coil = bank
            .coils
            .get_mut(name)
            .ok_or_else(|| HwError::UnknownCoil(name.to_string()))?;
        coil.enabled = enabled;
        Ok(())
    }

    pub fn pulses(&self) -> Vec<PulseRecord> {
        self.inner.lock().map(|b| b.log.clone()).unwrap_or_default()
    }

    pub fn pulse_count(&self, name: &str) -> usize {
        self.inner
            .lock()
            .map(|b| b.log.iter().filter(|p| p.coil == name).count())
            .unwrap_or(0)
    }

    /// Drain the pulse log.
    pub fn take_pulses(&self) -> Vec<PulseRecord> {
        self.inner
            .lock()
            .map(|mut b| std::mem::take(&mut b.log))
            .unwrap_or_default()
    }
}

impl Coils for SimCoils {
    fn pulse(&mut self, name: &str, duration_ms: Option<u32>) -> HwResult<()> {
        let at = self.clock.now();
        let mut bank = self
            .inner
            .lock()
            .map_err(|_| HwError::Poisoned("coil bank"))?;
        let coil = *bank
            .coils
            .get(name)
            .ok_or_else(|| HwError::UnknownCoil(name.to_string()))?;
        if !coil.enabled {
            return Err(Box::new(HwError::CoilDisabled(name.to_string())));
        }
        let ms = duration_ms.unwrap_or(coil.default_ms);
        tracing::debug!(coil = name, ms, "pulse (simulated)");
        bank.log.push(PulseRecord {
            coil: name.to_string(),
            duration_ms: ms,
            at,
        });
        Ok(())
    }
}

/// Simulated game context. Flags are shared across clones.
#[derive(Debug, Clone)]
pub struct SimGame {
    total_balls: Arc<AtomicU32>,
    tilted: Arc<AtomicBool>,
    start_pending: Arc<AtomicBool>,
    ready_signals: Arc<AtomicU32>,
}

impl SimGame {
    pub fn new(total_balls: u32) -> Self {
        Self {
            total_balls: Arc::new(AtomicU32::new(total_balls)),
            tilted: Arc::new(AtomicBool::new(false)),
            start_pending: Arc::new(AtomicBool::new(false)),
            ready_signals: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn set_total_balls(&self, n: u32) {
        self.total_balls.store(n, Ordering::Relaxed);
    }

    pub fn set_tilted(&self, tilted: bool) {
        self.tilted.store(tilted, Ordering::Relaxed);
    }

    pub fn set_start_pending(&self, pending: bool) {
        self.start_pending.store(pending, Ordering::Relaxed);
    }

    /// How many times the trough reported it is ready for a start.
    pub fn ready_signals(&self) -> u32 {
        self.ready_signals.load(Ordering::Relaxed)
    }
}

impl GameContext for SimGame {
    fn total_balls(&self) -> u32 {
        self.total_balls.load(Ordering::Relaxed)
    }

    fn is_tilted(&self) -> bool {
        self.tilted.load(Ordering::Relaxed)
    }

    fn game_start_pending(&self) -> bool {
        self.start_pending.load(Ordering::Relaxed)
    }

    fn ready_to_start(&mut self) {
        self.start_pending.store(false, Ordering::Relaxed);
        self.ready_signals.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trough_traits::ManualClock;

    #[test]
    fn switch_change_is_timestamped() {
        let clock = ManualClock::new();
        let sw = SimSwitches::new(Arc::new(clock.clone())).with_switch("shooter", false);
        assert_eq!(sw.time_since_change("shooter"), Duration::MAX);
        assert!(sw.set("shooter", true).unwrap());
        clock.advance(Duration::from_millis(700));
        assert!(sw.is_active("shooter"));
        assert_eq!(sw.time_since_change("shooter"), Duration::from_millis(700));
        assert!(!sw.set("shooter", true).unwrap());
    }

    #[test]
    fn pulse_uses_default_time() {
        let clock = ManualClock::new();
        let mut coils = SimCoils::new(Arc::new(clock)).with_coil("trough", 30);
        coils.pulse("trough", None).unwrap();
        coils.pulse("trough", Some(25)).unwrap();
        let log = coils.pulses();
        assert_eq!(log[0].duration_ms, 30);
        assert_eq!(log[1].duration_ms, 25);
    }

    #[test]
    fn poisoned_matrix_is_reported_as_such() {
        let sw = SimSwitches::new(Arc::new(ManualClock::new())).with_switch("shooter", false);
        let inner = Arc::clone(&sw.inner);
        let _ = std::thread::spawn(move || {
            let _guard = inner.lock().unwrap();
            panic!("poison the matrix");
        })
        .join();

        let err = sw.set("shooter", true).expect_err("lock is poisoned");
        assert!(matches!(err, HwError::Poisoned(_)));
        assert_eq!(err.to_string(), "switch matrix state is poisoned");
    }
}
