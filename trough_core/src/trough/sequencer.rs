//! Launch sequencing: one ball at a time from the trough to the shooter lane.

use trough_traits::{Coils, GameContext, Switches};

use super::TroughController;
use crate::launch::{LaunchCallback, LaunchRequest};
use crate::timers::TimerId;

impl<S: Switches, C: Coils, G: GameContext> TroughController<S, C, G> {
    /// Queue a request and start feeding if the sequencer was idle.
    pub(super) fn enqueue(
        &mut self,
        count: u32,
        stealth: bool,
        autoplunge: bool,
        callback: LaunchCallback,
    ) {
        if count == 0 {
            tracing::debug!("ignoring launch request for zero balls");
            return;
        }
        let was_idle = self
            .queue
            .push(LaunchRequest::new(count, stealth, autoplunge, callback));
        tracing::info!(
            count,
            stealth,
            autoplunge = autoplunge || stealth,
            pending = self.queue.pending(),
            "launch balls"
        );
        if was_idle {
            self.advance();
        }
    }

    /// Try to feed the next ball for the head request.
    pub(super) fn advance(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.state.eject_in_progress() {
            tracing::debug!("eject already in progress; not feeding another ball");
            return;
        }

        let lane = self.wiring.shooter_lane_switch.as_str();
        let lane_active = self.switches.is_active(lane);
        let since = self.switches.time_since_change(lane);
        if lane_active || since < self.timing.shooter_inactivity {
            // Keep the wait tight so multiball feeds are not slowed down.
            let delay = if lane_active {
                self.timing.lane_busy_retry
            } else {
                self.timing.shooter_inactivity - since + self.timing.lane_epsilon
            };
            tracing::info!(
                pending = self.queue.pending(),
                retry_ms = delay.as_millis() as u64,
                "shooter lane not ready; cannot feed ball"
            );
            self.schedule(TimerId::Launch, delay);
            return;
        }

        if self.balls_in_reservoir() == 0 {
            tracing::info!(
                pending = self.queue.pending(),
                "trough is empty; waiting for a ball to drain"
            );
            self.launch_halted = true;
            return;
        }

        self.launch_halted = false;
        self.eject_retries = 0;
        self.eject_failure_reported = false;
        self.state.eject_started();
        tracing::debug!(pending = self.queue.pending(), "feeding ball to shooter lane");
        let eject = self.wiring.eject_coil.clone();
        self.pulse(&eject, None);
        self.schedule(TimerId::EjectErrorWatch, self.timing.eject_watch);

        // Last ball of this request: it is on its way, not yet in the lane.
        let callback = match self.queue.head_mut() {
            Some(head) if head.balls_remaining() == 1 => head.take_callback(),
            _ => LaunchCallback::None,
        };
        self.fire_launch_callback(callback);
    }

    /// Shooter lane held active for the autoplunge settle time.
    pub(super) fn ball_reached_lane(&mut self) {
        self.timers.cancel(TimerId::EjectErrorWatch);

        if !self.state.eject_in_progress() {
            tracing::debug!("ball in shooter lane without a pending eject; ignoring");
            return;
        }

        let Some(fed) = self.queue.ball_fed() else {
            // Eject with an empty queue only happens after reset_for_ball.
            self.state.ball_fed(true);
            return;
        };
        self.state.ball_fed(fed.stealth);
        tracing::debug!(
            pending = self.queue.pending(),
            balls_in_play = self.state.in_play(),
            "fed ball to shooter lane"
        );

        if fed.autoplunge
            && let Some(plunger) = self.wiring.plunge_coil.clone()
        {
            tracing::info!("autoplunging ball");
            self.pulse(&plunger, None);
        }

        if self.queue.is_empty() {
            if let Some(cb) = self.hooks.on_all_launched.as_mut() {
                cb();
            }
        } else {
            // Let the ball clear the lane before feeding the next one.
            self.schedule(TimerId::Launch, self.timing.shooter_inactivity);
        }
    }

    /// The fed ball never showed up in the shooter lane.
    pub(super) fn eject_watchdog(&mut self) {
        if !self.state.eject_in_progress() {
            return;
        }

        let lane = self.wiring.shooter_lane_switch.as_str();
        if self
            .switches
            .is_inactive_for(lane, self.timing.shooter_inactivity)
        {
            if self.retry.allows(self.eject_retries) {
                self.eject_retries += 1;
                tracing::info!(
                    attempt = self.eject_retries,
                    "eject watchdog elapsed; ejecting the ball again"
                );
                let eject = self.wiring.eject_coil.clone();
                self.pulse(&eject, None);
            } else {
                if !self.eject_failure_reported {
                    self.eject_failure_reported = true;
                    tracing::warn!(
                        retries = self.eject_retries,
                        "eject retries exhausted; ball never reached the shooter lane"
                    );
                    if let Some(cb) = self.hooks.on_eject_failed.as_mut() {
                        cb();
                    }
                }
                return;
            }
        }
        self.schedule(TimerId::EjectErrorWatch, self.timing.eject_watch);
    }

    /// Restart a sequencer that stopped on an empty trough.
    pub(super) fn resume_halted_launch(&mut self) {
        if self.launch_halted
            && !self.queue.is_empty()
            && !self.state.eject_in_progress()
            && !self.timers.is_pending(TimerId::Launch)
        {
            tracing::debug!("trough changed; resuming halted launch");
            self.advance();
        }
    }

    fn fire_launch_callback(&mut self, callback: LaunchCallback) {
        match callback {
            LaunchCallback::None => {}
            LaunchCallback::BallSaved => {
                if let Some(cb) = self.hooks.on_ball_saved.as_mut() {
                    cb();
                }
            }
            LaunchCallback::Custom(f) => f(),
        }
    }
}
