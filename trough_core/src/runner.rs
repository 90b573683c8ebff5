//! Real-time driver: feeds channel input to a controller and fires its timers.
//!
//! The controller itself never sleeps. This loop waits on the input channel
//! until either something arrives or the next timer is due, then applies the
//! input and polls. Whoever sends `Input::Switch` must already have updated
//! the switch registry the controller reads from, the same way a switch
//! matrix latches state before it reports a transition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use trough_traits::{Coils, GameContext, Switches};

use crate::error::{Result, TroughError};
use crate::trough::TroughController;

/// Longest the loop sleeps before looking at the shutdown flag again.
pub const MAX_IDLE: Duration = Duration::from_millis(100);

/// Input accepted by [`run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Debounced switch transition.
    Switch { name: String, active: bool },
    Launch { count: u32, autoplunge: bool },
    BallSave(bool),
    ResetForBall,
    /// Stop the controller and leave the loop.
    Stop,
}

/// What happened during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub inputs: u64,
    pub timers_fired: u64,
}

fn apply<S: Switches, C: Coils, G: GameContext>(
    trough: &mut TroughController<S, C, G>,
    input: Input,
) -> Result<bool> {
    match input {
        Input::Switch { name, active } => trough.handle_switch(&name, active),
        Input::Launch { count, autoplunge } => {
            if autoplunge {
                trough.request_launch_and_autoplunge(count)?;
            } else {
                trough.request_launch(count);
            }
        }
        Input::BallSave(on) => trough.enable_ball_save(on),
        Input::ResetForBall => trough.reset_for_ball(),
        Input::Stop => {
            trough.stop();
            return Ok(false);
        }
    }
    Ok(true)
}

/// Drive `trough` until `Input::Stop`, channel disconnect, or `shutdown` is set.
pub fn run<S, C, G>(
    trough: &mut TroughController<S, C, G>,
    rx: &Receiver<Input>,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    S: Switches,
    C: Coils,
    G: GameContext,
{
    if trough.is_stopped() {
        return Err(eyre::Report::new(TroughError::State(
            "cannot run a stopped controller".into(),
        )));
    }

    let mut summary = RunSummary::default();
    tracing::info!("trough runner start");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            trough.stop();
            break;
        }

        let wait = trough
            .next_deadline()
            .map_or(MAX_IDLE, |d| {
                d.saturating_duration_since(trough.clock.now())
            })
            .min(MAX_IDLE);

        match rx.recv_timeout(wait) {
            Ok(input) => {
                summary.inputs += 1;
                tracing::trace!(?input, "runner input");
                if !apply(trough, input)? {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("input channel closed");
                trough.stop();
                break;
            }
        }

        summary.timers_fired += trough.poll() as u64;
    }

    tracing::info!(
        inputs = summary.inputs,
        timers_fired = summary.timers_fired,
        "trough runner stopped"
    );
    Ok(summary)
}
