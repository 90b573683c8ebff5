//! The trough controller.
//!
//! One object owns the ball accounting and the launch queue. Switch
//! transitions come in through [`TroughController::handle_switch`]; every
//! delayed action is a named timer that fires from [`TroughController::poll`].
//! Handlers run to completion and never block.
//!
//! The reconciler lives in `reconcile`, the launch sequencer in `sequencer`,
//! and the outhole/jam/early-save handlers in `auxiliary`. All three share
//! the counters in `state::BallState`, which nothing outside this module can
//! write.

mod auxiliary;
mod reconcile;
mod sequencer;
mod state;

pub use reconcile::{evaluate, CountSnapshot, SaveParams, Verdict};

use std::sync::Arc;
use std::time::{Duration, Instant};

use trough_traits::{Clock, Coils, GameContext, Switches};

use crate::catalog::ResolvedWiring;
use crate::config::{RetryPolicy, TimingCfg};
use crate::error::{Result, TroughError};
use crate::hw_error::map_hw_error;
use crate::launch::{LaunchCallback, LaunchQueue, LaunchRequest};
use crate::status::TroughStatus;
use crate::timers::{TimerId, TimerTable};
use state::BallState;

/// Callbacks and strategy functions installed by game logic.
#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) on_drain: Option<Box<dyn FnMut()>>,
    pub(crate) on_ball_saved: Option<Box<dyn FnMut()>>,
    pub(crate) on_all_launched: Option<Box<dyn FnMut()>>,
    pub(crate) on_eject_failed: Option<Box<dyn FnMut()>>,
    pub(crate) balls_to_save: Option<Box<dyn Fn() -> u32>>,
    pub(crate) allow_multiple_saves: Option<Box<dyn Fn() -> bool>>,
}

/// Options for a single launch request.
#[derive(Debug, Default)]
pub struct LaunchOptions {
    pub callback: LaunchCallback,
    /// Do not count the launched balls as in play.
    pub stealth: bool,
    pub autoplunge: bool,
}

impl LaunchOptions {
    pub fn stealth(mut self) -> Self {
        self.stealth = true;
        self
    }

    pub fn autoplunge(mut self) -> Self {
        self.autoplunge = true;
        self
    }

    /// Called once the last ball of the request has been ejected.
    pub fn on_launched<F: FnOnce() + 'static>(mut self, f: F) -> Self {
        self.callback = LaunchCallback::custom(f);
        self
    }
}

/// Unified controller for both the boxed and the statically dispatched variants.
pub struct TroughController<S: Switches, C: Coils, G: GameContext> {
    pub(crate) switches: S,
    pub(crate) coils: C,
    pub(crate) game: G,
    pub(crate) wiring: ResolvedWiring,
    pub(crate) timing: TimingCfg,
    pub(crate) retry: RetryPolicy,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) timers: TimerTable,
    state: BallState,
    queue: LaunchQueue,
    pub(crate) hooks: Hooks,
    launch_halted: bool,
    eject_retries: u32,
    eject_failure_reported: bool,
    stopped: bool,
}

impl<S: Switches, C: Coils, G: GameContext> core::fmt::Debug for TroughController<S, C, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TroughController")
            .field("state", &self.state)
            .field("queue", &self.queue)
            .field("timers", &self.timers)
            .field("launch_halted", &self.launch_halted)
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl<S: Switches, C: Coils, G: GameContext> TroughController<S, C, G> {
    pub(crate) fn new(
        switches: S,
        coils: C,
        game: G,
        wiring: ResolvedWiring,
        timing: TimingCfg,
        retry: RetryPolicy,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let mut this = Self {
            switches,
            coils,
            game,
            wiring,
            timing,
            retry,
            clock,
            timers: TimerTable::new(),
            state: BallState::default(),
            queue: LaunchQueue::default(),
            hooks: Hooks::default(),
            launch_halted: false,
            eject_retries: 0,
            eject_failure_reported: false,
            stopped: false,
        };
        this.arm_status_log();
        this
    }

    // ── Event entry points ───────────────────────────────────────────────────

    /// Deliver a debounced switch transition.
    ///
    /// Unknown switches are ignored. A stopped controller ignores everything.
    pub fn handle_switch(&mut self, name: &str, active: bool) {
        if self.stopped {
            return;
        }

        if self.wiring.position_switches.iter().any(|s| s == name) {
            // Restart the settle window on every bounce.
            self.schedule(TimerId::CheckSwitches, self.timing.settle);
        }

        if name == self.wiring.shooter_lane_switch {
            if active {
                self.schedule(TimerId::LaneSettle, self.timing.autoplunge_settle);
            } else {
                self.timers.cancel(TimerId::LaneSettle);
            }
        }

        if self.wiring.outhole.as_ref().is_some_and(|(sw, _)| sw == name) {
            if active {
                self.schedule(TimerId::OutholeKick, self.timing.outhole_settle);
            } else {
                self.timers.cancel(TimerId::OutholeKick);
            }
        }

        if let Some(idx) = self.wiring.jam_switches.iter().position(|s| s == name) {
            if active {
                self.schedule(TimerId::JamSettle(idx), self.timing.jam_settle);
            } else {
                self.timers.cancel(TimerId::JamSettle(idx));
            }
        }

        if active && self.wiring.early_save_switches.iter().any(|s| s == name) {
            self.early_save(name);
        }
    }

    /// Fire every timer that is due. Returns how many fired.
    pub fn poll(&mut self) -> usize {
        let mut fired = 0;
        while !self.stopped {
            let now = self.clock.now();
            let Some(id) = self.timers.pop_due(now) else {
                break;
            };
            self.fire(id);
            fired += 1;
        }
        fired
    }

    /// Earliest pending deadline, for callers that sleep between polls.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn timer_pending(&self, id: TimerId) -> bool {
        self.timers.is_pending(id)
    }

    fn fire(&mut self, id: TimerId) {
        tracing::trace!(timer = id.name(), "timer fired");
        match id {
            TimerId::CheckSwitches => self.check_switches(),
            TimerId::Launch => self.advance(),
            TimerId::EjectErrorWatch => self.eject_watchdog(),
            TimerId::LaneSettle => self.ball_reached_lane(),
            TimerId::OutholeKick => self.outhole_kick(),
            TimerId::JamSettle(idx) => self.clear_jam(idx),
            TimerId::Status => {
                self.log_status();
                self.arm_status_log();
            }
        }
    }

    pub(crate) fn schedule(&mut self, id: TimerId, delay: Duration) {
        let deadline = self.clock.now() + delay;
        tracing::trace!(timer = id.name(), delay_ms = delay.as_millis() as u64, "timer armed");
        self.timers.schedule(id, deadline);
    }

    /// Best-effort coil pulse; failures are logged, never propagated.
    pub(crate) fn pulse(&mut self, coil: &str, duration_ms: Option<u32>) {
        if let Err(e) = self.coils.pulse(coil, duration_ms) {
            let err = map_hw_error(e.as_ref());
            tracing::warn!(coil, error = %err, "coil pulse failed");
        }
    }

    // ── Launch requests ──────────────────────────────────────────────────────

    /// Launch `count` balls into play.
    pub fn request_launch(&mut self, count: u32) {
        self.request_launch_with(count, LaunchOptions::default());
    }

    pub fn request_launch_with(&mut self, count: u32, opts: LaunchOptions) {
        self.enqueue(count, opts.stealth, opts.autoplunge, opts.callback);
    }

    /// Launch and autoplunge `count` balls. Fails if no plunger coil is wired.
    pub fn request_launch_and_autoplunge(&mut self, count: u32) -> Result<()> {
        if self.wiring.plunge_coil.is_none() {
            return Err(eyre::Report::new(TroughError::Config(
                "cannot autoplunge: no plunge coil is configured".into(),
            )));
        }
        self.enqueue(count, false, true, LaunchCallback::None);
        Ok(())
    }

    /// Requests still in the queue, head first.
    pub fn launch_requests(&self) -> impl Iterator<Item = &LaunchRequest> {
        self.queue.iter()
    }

    pub fn launch_queue_len(&self) -> usize {
        self.queue.len()
    }

    // ── Counts ───────────────────────────────────────────────────────────────

    /// Balls resting in the trough right now.
    pub fn balls_in_reservoir(&self) -> u32 {
        let active = self
            .wiring
            .position_switches
            .iter()
            .filter(|s| self.switches.is_active(s))
            .count();
        u32::try_from(active).unwrap_or(u32::MAX)
    }

    pub fn is_full(&self) -> bool {
        self.balls_in_reservoir() == self.game.total_balls()
    }

    /// Balls not in the trough, locked balls included, pending launches not.
    pub fn balls_out(&self) -> u32 {
        self.game
            .total_balls()
            .saturating_sub(self.balls_in_reservoir())
    }

    /// Balls that will eventually be live: in play plus pending non-stealth launches.
    pub fn balls_requested(&self) -> u32 {
        self.state.in_play() + self.queue.non_stealth_remaining()
    }

    pub fn balls_in_play(&self) -> u32 {
        self.state.in_play()
    }

    pub fn balls_locked(&self) -> u32 {
        self.state.locked()
    }

    pub fn balls_pending_launch(&self) -> u32 {
        self.queue.pending()
    }

    pub fn eject_in_progress(&self) -> bool {
        self.state.eject_in_progress()
    }

    pub fn ball_save_active(&self) -> bool {
        self.state.ball_save_active()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn snapshot(&self) -> TroughStatus {
        TroughStatus {
            balls_in_reservoir: self.balls_in_reservoir(),
            balls_in_play: self.state.in_play(),
            balls_locked: self.state.locked(),
            balls_pending_launch: self.queue.pending(),
            launch_requests: self.queue.len(),
            eject_in_progress: self.state.eject_in_progress(),
            ball_save_active: self.state.ball_save_active(),
            launch_halted: self.launch_halted,
            is_full: self.is_full(),
        }
    }

    // ── Owner controls ───────────────────────────────────────────────────────

    pub fn enable_ball_save(&mut self, enable: bool) {
        tracing::debug!(enable, "ball save");
        self.state.set_ball_save(enable);
    }

    pub fn set_balls_locked(&mut self, n: u32) {
        self.state.set_locked(n);
    }

    pub fn lock_ball(&mut self) {
        self.state.set_locked(self.state.locked().saturating_add(1));
    }

    pub fn release_locked_ball(&mut self) {
        self.state.set_locked(self.state.locked().saturating_sub(1));
    }

    /// Ball start: nothing in play, queue cleared, no eject outstanding.
    pub fn reset_for_ball(&mut self) {
        self.state.reset_for_ball();
        self.queue.clear();
        self.launch_halted = false;
        self.eject_retries = 0;
        self.eject_failure_reported = false;
        self.timers.cancel(TimerId::Launch);
        self.timers.cancel(TimerId::EjectErrorWatch);
        tracing::debug!("trough reset for ball start");
    }

    /// Cancel every pending timer and ignore further input until `start`.
    pub fn stop(&mut self) {
        self.timers.cancel_all();
        self.stopped = true;
        tracing::info!("trough controller stopped");
    }

    pub fn start(&mut self) {
        if !self.stopped {
            return;
        }
        self.stopped = false;
        self.arm_status_log();
        // Whatever moved while stopped still needs counting.
        self.schedule(TimerId::CheckSwitches, self.timing.settle);
        self.rearm_after_stop();
        tracing::info!("trough controller started");
    }

    /// Rebuild the timers `stop` cancelled from the counters and the
    /// switches as they are now.
    fn rearm_after_stop(&mut self) {
        if self.switches.is_active(&self.wiring.shooter_lane_switch) {
            self.schedule(TimerId::LaneSettle, self.timing.autoplunge_settle);
        }
        if self.state.eject_in_progress() {
            self.schedule(TimerId::EjectErrorWatch, self.timing.eject_watch);
        } else if !self.queue.is_empty() {
            self.advance();
        }

        let outhole_held = self
            .wiring
            .outhole
            .as_ref()
            .is_some_and(|(sw, _)| self.switches.is_active(sw));
        if outhole_held {
            self.schedule(TimerId::OutholeKick, self.timing.outhole_settle);
        }
        let jammed: Vec<usize> = self
            .wiring
            .jam_switches
            .iter()
            .enumerate()
            .filter(|(_, sw)| self.switches.is_active(sw))
            .map(|(idx, _)| idx)
            .collect();
        for idx in jammed {
            self.schedule(TimerId::JamSettle(idx), self.timing.jam_settle);
        }
    }

    // ── Hooks ────────────────────────────────────────────────────────────────

    /// Called once per unsaved drain.
    pub fn set_on_drain<F: FnMut() + 'static>(&mut self, f: F) {
        self.hooks.on_drain = Some(Box::new(f));
    }

    /// Called as each saved ball is ejected.
    pub fn set_on_ball_saved<F: FnMut() + 'static>(&mut self, f: F) {
        self.hooks.on_ball_saved = Some(Box::new(f));
    }

    /// Called when the queue empties and the last ball is in the shooter lane.
    pub fn set_on_all_launched<F: FnMut() + 'static>(&mut self, f: F) {
        self.hooks.on_all_launched = Some(Box::new(f));
    }

    /// Called once when a bounded retry policy gives up on an eject.
    pub fn set_on_eject_failed<F: FnMut() + 'static>(&mut self, f: F) {
        self.hooks.on_eject_failed = Some(Box::new(f));
    }

    pub fn set_balls_to_save<F: Fn() -> u32 + 'static>(&mut self, f: F) {
        self.hooks.balls_to_save = Some(Box::new(f));
    }

    pub fn set_allow_multiple_saves<F: Fn() -> bool + 'static>(&mut self, f: F) {
        self.hooks.allow_multiple_saves = Some(Box::new(f));
    }

    // ── Hardware access ──────────────────────────────────────────────────────

    pub fn switches(&self) -> &S {
        &self.switches
    }

    pub fn coils(&self) -> &C {
        &self.coils
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut G {
        &mut self.game
    }

    pub fn timing(&self) -> &TimingCfg {
        &self.timing
    }

    // ── Status log ───────────────────────────────────────────────────────────

    fn arm_status_log(&mut self) {
        if let Some(every) = self.timing.status_log {
            self.schedule(TimerId::Status, every);
        }
    }

    fn log_status(&self) {
        tracing::debug!(
            balls_in_reservoir = self.balls_in_reservoir(),
            balls_in_play = self.state.in_play(),
            balls_locked = self.state.locked(),
            pending = self.queue.pending(),
            "trough status"
        );
    }
}
