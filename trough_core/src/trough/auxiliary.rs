//! Handlers around the trough that never touch the ball counts.

use trough_traits::{Coils, GameContext, Switches};

use super::TroughController;
use crate::launch::LaunchCallback;

impl<S: Switches, C: Coils, G: GameContext> TroughController<S, C, G> {
    /// Outhole switch held long enough for the ball to settle: kick it into the trough.
    pub(super) fn outhole_kick(&mut self) {
        let Some((_, coil)) = self.wiring.outhole.clone() else {
            return;
        };
        tracing::debug!(coil = %coil, "kicking ball from outhole");
        self.pulse(&coil, None);
    }

    /// Jam switch held active: nudge the eject coil with a slightly shorter pulse.
    pub(super) fn clear_jam(&mut self, idx: usize) {
        let switch = self
            .wiring
            .jam_switches
            .get(idx)
            .map_or("?", String::as_str);
        tracing::info!(switch, "detected ball jam; ejecting a ball");
        let ms = self
            .wiring
            .eject_pulse_ms
            .saturating_sub(self.timing.jam_pulse_margin_ms)
            .max(1);
        let coil = self.wiring.eject_coil.clone();
        self.pulse(&coil, Some(ms));
    }

    /// Outlane hit while the saver is on: relaunch before the ball reaches the trough.
    pub(super) fn early_save(&mut self, switch: &str) {
        if !self.state.ball_save_active() {
            return;
        }
        // No ball to feed yet; the trough switches will handle it on drain.
        if self.balls_in_reservoir() == 0 {
            tracing::debug!(switch, "early save skipped; trough is empty");
            return;
        }
        tracing::info!(switch, "early ball save");
        self.enqueue(1, true, true, LaunchCallback::BallSaved);
    }
}
