use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use trough_hardware::error::HwError;
use trough_hardware::{SimCoils, SimGame, SimSwitches};
use trough_traits::{Clock, Coils, GameContext, ManualClock, Switches};

fn clocked() -> (ManualClock, Arc<dyn Clock + Send + Sync>) {
    let clock = ManualClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    (clock, shared)
}

#[rstest]
fn clones_share_switch_state() {
    let (_, shared) = clocked();
    let a = SimSwitches::new(shared).with_switch("trough1", true);
    let b = a.clone();
    a.set("trough1", false).unwrap();
    assert!(!b.is_active("trough1"));
}

#[rstest]
fn unknown_switch_is_typed_error() {
    let (_, shared) = clocked();
    let sw = SimSwitches::new(shared);
    assert!(matches!(sw.set("ghost", true), Err(HwError::UnknownSwitch(name)) if name == "ghost"));
    assert!(!sw.is_active("ghost"));
}

#[rstest]
fn inactive_for_waits_out_threshold() {
    let (clock, shared) = clocked();
    let sw = SimSwitches::new(shared).with_switch("shooter", true);
    sw.set("shooter", false).unwrap();
    clock.advance(Duration::from_millis(1500));
    assert!(!sw.is_inactive_for("shooter", Duration::from_secs(2)));
    clock.advance(Duration::from_millis(500));
    assert!(sw.is_inactive_for("shooter", Duration::from_secs(2)));
}

#[rstest]
#[case::unknown("kicker", false, "unknown coil")]
#[case::disabled("trough", true, "disabled")]
fn failing_pulses(#[case] coil: &str, #[case] disable: bool, #[case] needle: &str) {
    let (_, shared) = clocked();
    let mut coils = SimCoils::new(shared).with_coil("trough", 30);
    if disable {
        coils.set_enabled("trough", false).unwrap();
    }
    let err = coils.pulse(coil, None).expect_err("pulse must fail");
    assert!(err.to_string().contains(needle), "got: {err}");
    assert!(err.downcast_ref::<HwError>().is_some());
    assert!(coils.pulses().is_empty());
}

#[rstest]
fn take_pulses_drains_log() {
    let (clock, shared) = clocked();
    let mut coils = SimCoils::new(shared).with_coil("trough", 30);
    coils.pulse("trough", None).unwrap();
    clock.advance(Duration::from_millis(10));
    coils.pulse("trough", Some(25)).unwrap();
    assert_eq!(coils.pulse_count("trough"), 2);
    let taken = coils.take_pulses();
    assert_eq!(taken.len(), 2);
    assert!(taken[1].at > taken[0].at);
    assert_eq!(coils.pulse_count("trough"), 0);
}

#[rstest]
fn game_ready_clears_pending() {
    let mut game = SimGame::new(3);
    game.set_start_pending(true);
    game.ready_to_start();
    assert!(!game.game_start_pending());
    assert_eq!(game.ready_signals(), 1);
    game.set_tilted(true);
    assert!(game.is_tilted());
    game.set_total_balls(4);
    assert_eq!(game.total_balls(), 4);
}
