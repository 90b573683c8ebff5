//! Point-in-time view of the controller's counters.

/// Snapshot returned by `TroughController::snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TroughStatus {
    /// Active trough position switches.
    pub balls_in_reservoir: u32,
    pub balls_in_play: u32,
    pub balls_locked: u32,
    pub balls_pending_launch: u32,
    pub launch_requests: usize,
    pub eject_in_progress: bool,
    pub ball_save_active: bool,
    /// Sequencer is waiting for a ball to come home before it can feed.
    pub launch_halted: bool,
    pub is_full: bool,
}
