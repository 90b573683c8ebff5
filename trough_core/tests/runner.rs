mod common;

use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use common::{Rig, SHOOTER};
use rstest::rstest;
use trough_core::runner::{run, Input};

#[rstest]
fn runner_applies_inputs_until_stop() {
    let mut rig = Rig::new();
    let (tx, rx) = crossbeam_channel::unbounded();
    let shutdown = AtomicBool::new(false);

    tx.send(Input::Launch {
        count: 1,
        autoplunge: true,
    })
    .unwrap();
    tx.send(Input::BallSave(true)).unwrap();
    tx.send(Input::Stop).unwrap();

    let summary = run(&mut rig.trough, &rx, &shutdown).expect("run");
    assert_eq!(summary.inputs, 3);
    assert_eq!(rig.ejects(), 1);
    assert!(rig.trough.ball_save_active());
    assert!(rig.trough.is_stopped());
}

#[rstest]
fn runner_stops_on_disconnect() {
    let mut rig = Rig::new();
    let (tx, rx) = crossbeam_channel::unbounded::<Input>();
    let shutdown = AtomicBool::new(false);

    let producer = thread::spawn(move || {
        tx.send(Input::Switch {
            name: SHOOTER.to_string(),
            active: false,
        })
        .unwrap();
        thread::sleep(Duration::from_millis(20));
        // tx dropped here
    });

    let summary = run(&mut rig.trough, &rx, &shutdown).expect("run");
    producer.join().unwrap();
    assert_eq!(summary.inputs, 1);
    assert!(rig.trough.is_stopped());
}

#[rstest]
fn runner_honours_shutdown_flag() {
    let mut rig = Rig::new();
    let (_tx, rx) = crossbeam_channel::unbounded::<Input>();
    let shutdown = AtomicBool::new(true);

    let summary = run(&mut rig.trough, &rx, &shutdown).expect("run");
    assert_eq!(summary.inputs, 0);
    assert!(rig.trough.is_stopped());
}

#[rstest]
fn runner_refuses_stopped_controller() {
    let mut rig = Rig::new();
    rig.trough.stop();
    let (_tx, rx) = crossbeam_channel::unbounded::<Input>();
    let shutdown = AtomicBool::new(false);
    assert!(run(&mut rig.trough, &rx, &shutdown).is_err());
}
