//! Ball accounting shared by the reconciler and the launch sequencer.
//!
//! Fields are private to this module; each mutation is named after the
//! physical event that causes it, and only `trough` submodules can call them.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(super) struct BallState {
    in_play: u32,
    locked: u32,
    eject_in_progress: bool,
    ball_save_active: bool,
}

impl BallState {
    pub(super) fn in_play(&self) -> u32 {
        self.in_play
    }

    pub(super) fn locked(&self) -> u32 {
        self.locked
    }

    pub(super) fn eject_in_progress(&self) -> bool {
        self.eject_in_progress
    }

    pub(super) fn ball_save_active(&self) -> bool {
        self.ball_save_active
    }

    // ── reconciler ───────────────────────────────────────────────────────────

    /// One live ball came home. Returns the new in-play count.
    pub(super) fn ball_drained(&mut self) -> u32 {
        self.in_play = self.in_play.saturating_sub(1);
        self.in_play
    }

    /// Overwrite the in-play count when the trough proves it wrong.
    pub(super) fn correct_in_play(&mut self, n: u32) {
        self.in_play = n;
    }

    /// A save consumed the ball saver.
    pub(super) fn save_used(&mut self) {
        self.ball_save_active = false;
    }

    // ── launch sequencer ─────────────────────────────────────────────────────

    pub(super) fn eject_started(&mut self) {
        debug_assert!(!self.eject_in_progress, "eject already in progress");
        self.eject_in_progress = true;
    }

    /// The ejected ball reached the shooter lane.
    pub(super) fn ball_fed(&mut self, stealth: bool) {
        self.eject_in_progress = false;
        if !stealth {
            self.in_play = self.in_play.saturating_add(1);
        }
    }

    // ── owner (game logic) ───────────────────────────────────────────────────

    pub(super) fn set_ball_save(&mut self, active: bool) {
        self.ball_save_active = active;
    }

    pub(super) fn set_locked(&mut self, n: u32) {
        self.locked = n;
    }

    /// Ball start: nothing is in play and no eject is outstanding.
    pub(super) fn reset_for_ball(&mut self) {
        self.in_play = 0;
        self.eject_in_progress = false;
    }
}
