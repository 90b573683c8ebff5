mod common;

use std::time::Duration;

use common::{wiring, Rig, RigOpts, EJECT, POSITIONS, SHOOTER};
use rstest::rstest;
use trough_core::{Catalog, TimerId, TimingCfg};

fn outhole_rig() -> Rig {
    let w = wiring();
    Rig::with(RigOpts {
        catalog: Catalog::from_wiring(&w)
            .with_switch("outhole", &[])
            .with_coil("outholeKicker", 40, &["outhole"]),
        wiring: w,
        extra_switches: vec!["outhole"],
        extra_coils: vec![("outholeKicker", 40)],
        ..RigOpts::default()
    })
}

#[rstest]
fn outhole_kicks_after_ball_settles() {
    let mut rig = outhole_rig();
    rig.set("outhole", true);
    rig.run_for(200);
    assert_eq!(rig.coils.pulse_count("outholeKicker"), 0);
    rig.run_for(200);
    assert_eq!(rig.coils.pulse_count("outholeKicker"), 1);
    // Kicking the outhole never touches the counts.
    assert_eq!(rig.calls.drains.get(), 0);
    assert_eq!(rig.trough.balls_in_play(), 0);
}

#[rstest]
fn outhole_bounce_restarts_settle() {
    let mut rig = outhole_rig();
    rig.set("outhole", true);
    rig.run_for(200);
    rig.set("outhole", false);
    rig.run_for(200);
    assert_eq!(rig.coils.pulse_count("outholeKicker"), 0);
    rig.set("outhole", true);
    rig.run_for(300);
    assert_eq!(rig.coils.pulse_count("outholeKicker"), 1);
}

#[rstest]
fn jam_switch_pulses_eject_short() {
    let w = wiring();
    let mut rig = Rig::with(RigOpts {
        catalog: Catalog::from_wiring(&w).with_switch("troughJam", &["troughJam"]),
        wiring: w,
        extra_switches: vec!["troughJam"],
        ..RigOpts::default()
    });
    rig.set("troughJam", true);
    rig.run_for(1900);
    assert_eq!(rig.ejects(), 0);
    rig.run_for(200);
    assert_eq!(rig.ejects(), 1);
    let last = rig.coils.pulses().pop().expect("jam pulse");
    assert_eq!(last.coil, EJECT);
    assert_eq!(last.duration_ms, 25);
}

#[rstest]
fn jam_cleared_before_settle_does_nothing() {
    let w = wiring();
    let mut rig = Rig::with(RigOpts {
        catalog: Catalog::from_wiring(&w).with_switch("jam", &["troughJam"]),
        wiring: w,
        extra_switches: vec!["jam"],
        ..RigOpts::default()
    });
    rig.set("jam", true);
    rig.run_for(1000);
    rig.set("jam", false);
    rig.run_for(3000);
    assert_eq!(rig.ejects(), 0);
}

fn early_save_rig() -> Rig {
    let w = wiring().with_early_save_switches(["outlaneL"]);
    Rig::with(RigOpts {
        catalog: Catalog::from_wiring(&w),
        wiring: w,
        ..RigOpts::default()
    })
}

#[rstest]
fn early_save_launches_stealth_ball() {
    let mut rig = early_save_rig();
    rig.start_ball();
    rig.trough.enable_ball_save(true);
    rig.set("outlaneL", true);
    assert_eq!(rig.trough.balls_pending_launch(), 1);

    rig.run_for(2100);
    assert_eq!(rig.ejects(), 2);
    assert_eq!(rig.calls.saves.get(), 1);
    rig.ball_to_lane();
    assert_eq!(rig.trough.balls_in_play(), 1);
}

#[rstest]
fn early_save_ignored_without_ball_save() {
    let mut rig = early_save_rig();
    rig.start_ball();
    rig.set("outlaneL", true);
    assert_eq!(rig.trough.balls_pending_launch(), 0);
}

#[rstest]
fn stop_cancels_pending_count() {
    let mut rig = Rig::new();
    rig.start_ball();
    rig.drain_ball();
    rig.trough.stop();
    assert!(rig.trough.next_deadline().is_none());
    rig.run_for(1000);
    assert_eq!(rig.calls.drains.get(), 0);

    // Ignored while stopped.
    rig.set(SHOOTER, true);
    assert!(!rig.trough.timer_pending(TimerId::LaneSettle));
    rig.set(SHOOTER, false);

    rig.trough.start();
    rig.run_for(600);
    assert_eq!(rig.calls.drains.get(), 1);
}

#[rstest]
fn status_log_rearms() {
    let mut rig = Rig::with(RigOpts {
        timing: TimingCfg {
            status_log: Some(Duration::from_secs(1)),
            ..TimingCfg::default()
        },
        ..RigOpts::default()
    });
    assert!(rig.trough.timer_pending(TimerId::Status));
    rig.run_for(2500);
    assert!(rig.trough.timer_pending(TimerId::Status));
    assert_eq!(rig.trough.snapshot().balls_in_reservoir, POSITIONS.len() as u32);
}
