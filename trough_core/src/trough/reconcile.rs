//! Ball-count reconciliation.
//!
//! Runs after the trough switches have been quiet for the settle window and
//! decides, from that one snapshot, whether a ball drained, was saved, or
//! whether the count says nothing actionable yet.

use trough_traits::{Coils, GameContext, Switches};

use super::TroughController;
use crate::launch::LaunchCallback;
use crate::timers::TimerId;

/// Counts the decision is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSnapshot {
    /// Balls installed in the machine.
    pub total: u32,
    /// Active trough position switches right now.
    pub in_reservoir: u32,
    pub locked: u32,
    pub in_play: u32,
    /// Balls queued for launch that are still sitting in the trough.
    pub pending: u32,
}

/// Ball-save strategy values sampled at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveParams {
    pub balls_to_save: u32,
    pub allow_multiple: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Relaunch `balls` stealth balls; `disable_save` turns the saver off now.
    Save { balls: u32, disable_save: bool },
    /// Fewer balls than a save would need; look again shortly.
    SaveDeferred { available: i64, expected: i64 },
    /// Every unlocked ball is home. `in_play` is the new count.
    BallEnded { in_play: u32 },
    /// All but one ball is home: exactly one is left in play.
    MultiballEnded,
    /// One ball of several drained. `in_play` is the new count.
    MultiballDrain { in_play: u32 },
    /// Count matches no rule but more than one ball is out.
    AmbiguousDrain,
    NoChange,
}

/// Classify a settled snapshot. Callers only ask while balls are in play.
pub fn evaluate(s: &CountSnapshot, save: Option<SaveParams>) -> Verdict {
    let total = i64::from(s.total);
    let current = i64::from(s.in_reservoir);
    let locked = i64::from(s.locked);
    let in_play = i64::from(s.in_play);
    let pending = i64::from(s.pending);

    if let Some(save) = save {
        // Balls that should be out if one just drained and is being saved.
        let out = locked + (i64::from(save.balls_to_save) - 1);
        let expected = total - out;
        let available = current - pending;
        if available >= expected {
            return if save.allow_multiple {
                let balls = u32::try_from(available - expected + 1).unwrap_or(u32::MAX);
                Verdict::Save {
                    balls,
                    disable_save: false,
                }
            } else {
                Verdict::Save {
                    balls: 1,
                    disable_save: true,
                }
            };
        }
        return Verdict::SaveDeferred {
            available,
            expected,
        };
    }

    let if_ball_ending = total - locked;
    let if_multiball_ending = if_ball_ending - 1;
    let if_multiball_drain = if_ball_ending - (in_play - 1);

    if current == total || current == if_ball_ending {
        Verdict::BallEnded {
            in_play: s.in_play.saturating_sub(1),
        }
    } else if current == if_multiball_ending {
        Verdict::MultiballEnded
    } else if current == if_multiball_drain {
        let in_play = if s.in_play < 3 { 2 } else { s.in_play - 1 };
        Verdict::MultiballDrain { in_play }
    } else if s.in_play > 1 {
        Verdict::AmbiguousDrain
    } else {
        Verdict::NoChange
    }
}

impl<S: Switches, C: Coils, G: GameContext> TroughController<S, C, G> {
    fn count_snapshot(&self) -> CountSnapshot {
        CountSnapshot {
            total: self.game.total_balls(),
            in_reservoir: self.balls_in_reservoir(),
            locked: self.state.locked(),
            in_play: self.state.in_play(),
            pending: self.queue.pending(),
        }
    }

    fn save_params(&self) -> SaveParams {
        SaveParams {
            balls_to_save: self.hooks.balls_to_save.as_ref().map_or(0, |f| f()),
            allow_multiple: self.hooks.allow_multiple_saves.as_ref().is_some_and(|f| f()),
        }
    }

    /// Settle-timer handler for the trough position switches.
    pub(super) fn check_switches(&mut self) {
        if self.state.eject_in_progress() {
            // A ball on its way to the shooter lane perturbs the count.
            tracing::debug!("eject in progress; skipping trough count");
        } else if self.state.in_play() > 0 {
            let snap = self.count_snapshot();
            let save = self
                .state
                .ball_save_active()
                .then(|| self.save_params());
            let verdict = evaluate(&snap, save);
            tracing::debug!(?snap, ?verdict, "trough settled");
            self.apply(verdict, &snap);
        } else if self.is_full() && self.game.game_start_pending() {
            tracing::info!("trough full; ready to start");
            self.game.ready_to_start();
        } else if self.game.is_tilted() {
            // Let ball-ending logic run while tilted.
            self.drained();
        }

        self.resume_halted_launch();
    }

    fn apply(&mut self, verdict: Verdict, snap: &CountSnapshot) {
        match verdict {
            Verdict::Save {
                balls,
                disable_save,
            } => {
                if disable_save {
                    // Another ball may drain before the save callback runs.
                    self.state.save_used();
                }
                tracing::info!(balls, "saving balls");
                for _ in 0..balls {
                    self.enqueue(1, true, true, LaunchCallback::BallSaved);
                }
            }
            Verdict::SaveDeferred {
                available,
                expected,
            } => {
                tracing::warn!(
                    current = snap.in_reservoir,
                    pending = snap.pending,
                    available,
                    expected,
                    "fewer balls in trough than a save expects; not launching, retry shortly"
                );
                self.schedule(TimerId::CheckSwitches, self.timing.recheck);
            }
            Verdict::BallEnded { in_play } => {
                self.state.ball_drained();
                tracing::info!(balls_in_play = in_play, "ball drained");
                self.drained();
                if self.state.in_play() > 0 {
                    // More balls may have settled in the same window; they
                    // will not raise another switch event.
                    self.schedule(TimerId::CheckSwitches, self.timing.recheck);
                }
            }
            Verdict::MultiballEnded => {
                self.state.correct_in_play(1);
                tracing::info!("multiball ended; one ball left in play");
                self.drained();
            }
            Verdict::MultiballDrain { in_play } => {
                self.state.correct_in_play(in_play);
                tracing::info!(balls_in_play = in_play, "multiball ball drained");
                self.drained();
            }
            Verdict::AmbiguousDrain => {
                // Drain signalled without touching balls_in_play; repeated hits
                // here let the counter drift from the playfield.
                tracing::warn!(
                    current = snap.in_reservoir,
                    balls_in_play = snap.in_play,
                    locked = snap.locked,
                    "trough count matches no drain rule; signalling drain without adjusting balls in play"
                );
                self.drained();
            }
            Verdict::NoChange => {}
        }
    }

    fn drained(&mut self) {
        match self.hooks.on_drain.as_mut() {
            Some(cb) => cb(),
            None => tracing::warn!("ball drained but no drain handler is installed"),
        }
    }
}
