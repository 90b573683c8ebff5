use std::io::Write;

use rstest::rstest;
use trough_config::{load_file, load_toml};

const MACHINE: &str = r#"
[machine]
num_balls = 4

[[switches]]
name = "trough1"
initial = true
[[switches]]
name = "trough2"
initial = true
[[switches]]
name = "trough3"
[[switches]]
name = "trough4"
[[switches]]
name = "shooterLane"
[[switches]]
name = "outlaneL"
[[switches]]
name = "troughJam"
tags = "troughJam, opto"

[[coils]]
name = "trough"
pulse_ms = 30
[[coils]]
name = "autoPlunger"
pulse_ms = 25

[trough]
position_switches = ["trough1", "trough2", "trough3", "trough4"]
eject_switch = "trough1"
eject_coil = "trough"
shooter_lane_switch = "shooterLane"
plunge_coil = "autoPlunger"
early_save_switches = ["outlaneL"]

[timing]
settle_ms = 400

[retry]
max_eject_retries = 5
"#;

#[rstest]
fn full_machine_parses_and_validates() {
    let cfg = load_toml(MACHINE).expect("parse");
    cfg.validate().expect("valid");
    assert_eq!(cfg.machine.num_balls, 4);
    assert_eq!(cfg.timing.settle_ms, 400);
    // Unset timing keys keep their defaults.
    assert_eq!(cfg.timing.shooter_inactivity_ms, 2000);
    assert_eq!(cfg.retry.max_eject_retries, Some(5));
    assert_eq!(
        cfg.switch("troughJam").map(|s| s.tags.clone()),
        Some(vec!["troughJam".to_string(), "opto".to_string()])
    );
    assert!(cfg.switch("trough1").is_some_and(|s| s.initial));
    assert_eq!(cfg.coil("autoPlunger").map(|c| c.pulse_ms), Some(25));
}

#[rstest]
fn coil_pulse_defaults_to_thirty() {
    let text = MACHINE.replace("name = \"trough\"\npulse_ms = 30", "name = \"trough\"");
    let cfg = load_toml(&text).expect("parse");
    assert_eq!(cfg.coil("trough").map(|c| c.pulse_ms), Some(30));
}

#[rstest]
#[case::zero_balls("num_balls = 4", "num_balls = 0", "num_balls")]
#[case::undeclared_switch("eject_switch = \"trough1\"", "eject_switch = \"trough9\"", "trough9")]
#[case::eject_not_position(
    "eject_switch = \"trough1\"",
    "eject_switch = \"outlaneL\"",
    "eject_switch"
)]
#[case::undeclared_plunger("plunge_coil = \"autoPlunger\"", "plunge_coil = \"kicker\"", "kicker")]
#[case::zero_retries("max_eject_retries = 5", "max_eject_retries = 0", "max_eject_retries")]
#[case::long_settle("settle_ms = 400", "settle_ms = 20000", "settle_ms")]
#[case::zero_inactivity(
    "settle_ms = 400",
    "settle_ms = 400\nshooter_inactivity_ms = 0",
    "shooter_inactivity_ms"
)]
#[case::pulse_too_long("pulse_ms = 25", "pulse_ms = 300", "pulse_ms")]
#[case::duplicate_position(
    "\"trough3\", \"trough4\"]",
    "\"trough3\", \"trough3\"]",
    "twice"
)]
fn invalid_machine_rejected(#[case] from: &str, #[case] to: &str, #[case] needle: &str) {
    let text = MACHINE.replace(from, to);
    assert_ne!(text, MACHINE, "case must change the config");
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().expect_err("should be rejected");
    let msg = err.to_string();
    assert!(msg.contains(needle), "unexpected message: {msg}");
}

#[rstest]
fn duplicate_switch_rejected() {
    let text = MACHINE.replace(
        "[[switches]]\nname = \"trough3\"",
        "[[switches]]\nname = \"trough2\"\n[[switches]]\nname = \"trough3\"",
    );
    let cfg = load_toml(&text).expect("parse");
    let err = cfg.validate().expect_err("duplicate");
    assert!(err.to_string().contains("duplicate switch name 'trough2'"));
}

#[rstest]
fn bad_log_level_rejected() {
    let text = format!("{MACHINE}\n[logging]\nlevel = \"loud\"\n");
    let cfg = load_toml(&text).expect("parse");
    assert!(cfg.validate().is_err());
}

#[rstest]
fn missing_trough_section_is_parse_error() {
    assert!(load_toml("[machine]\nnum_balls = 3\n").is_err());
}

#[rstest]
fn load_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("machine.toml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(MACHINE.as_bytes())
        .unwrap();
    let cfg = load_file(&path).expect("load");
    assert_eq!(cfg.trough.position_switches.len(), 4);

    let missing = dir.path().join("nope.toml");
    let err = load_file(&missing).expect_err("missing file");
    assert!(err.to_string().contains("nope.toml"));
}
