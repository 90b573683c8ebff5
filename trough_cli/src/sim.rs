//! Simulated machine assembly, scripted replay and the stdin-driven real-time run.

use std::cell::Cell;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossbeam_channel::Sender;
use eyre::{Result, WrapErr};
use trough_config::{Config, ScenarioRow};
use trough_core::runner::{self, Input, RunSummary};
use trough_core::{Catalog, RetryPolicy, TimingCfg, TroughG, TroughStatus, TroughWiring};
use trough_hardware::{SimCoils, SimGame, SimSwitches};
use trough_traits::{Clock, ManualClock, MonotonicClock};

pub type SimTrough = TroughG<SimSwitches, SimCoils, SimGame>;

/// Clock step while replaying a script.
const TICK: Duration = Duration::from_millis(5);

/// A controller wired to simulated hardware, plus handles to drive it.
pub struct SimMachine {
    pub trough: SimTrough,
    pub switches: SimSwitches,
    pub coils: SimCoils,
    pub game: SimGame,
}

/// Build a controller on simulated hardware described by `cfg`.
///
/// Switches start in their configured `initial` state and every declared coil
/// is registered with its default pulse.
pub fn assemble<K>(cfg: &Config, clock: &K) -> Result<SimMachine>
where
    K: Clock + Clone + Send + Sync + 'static,
{
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());

    let switches = SimSwitches::new(Arc::clone(&shared));
    for sw in &cfg.switches {
        switches.register(&sw.name, sw.initial);
    }
    let coils = cfg
        .coils
        .iter()
        .fold(SimCoils::new(shared), |bank, c| bank.with_coil(&c.name, c.pulse_ms));
    let game = SimGame::new(cfg.machine.num_balls);

    let wiring: TroughWiring = (&cfg.trough).into();
    let catalog: Catalog = cfg.into();
    let timing: TimingCfg = (&cfg.timing).into();
    let retry: RetryPolicy = (&cfg.retry).into();

    let trough = trough_core::build_trough(
        switches.clone(),
        coils.clone(),
        game.clone(),
        wiring,
        Some(catalog),
        timing,
        Some(retry),
        Some(Box::new(clock.clone())),
    )
    .wrap_err("assemble trough controller")?;

    Ok(SimMachine {
        trough,
        switches,
        coils,
        game,
    })
}

/// Outcome of a scripted replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimReport {
    pub status: TroughStatus,
    pub elapsed_ms: u64,
    /// Script rows that changed a switch.
    pub transitions: usize,
    pub timers_fired: u64,
    pub drains: u32,
    pub saves: u32,
    pub all_launched: u32,
    pub eject_failures: u32,
    /// Times the trough told the game it may start.
    pub ready_signals: u32,
    pub ejects: usize,
    pub plunges: usize,
}

#[derive(Default, Clone)]
struct HookCounts {
    drains: Rc<Cell<u32>>,
    saves: Rc<Cell<u32>>,
    all_launched: Rc<Cell<u32>>,
    eject_failures: Rc<Cell<u32>>,
}

fn bump(c: &Rc<Cell<u32>>) -> impl FnMut() + 'static {
    let c = Rc::clone(c);
    move || c.set(c.get() + 1)
}

impl HookCounts {
    fn attach(trough: &mut SimTrough) -> Self {
        let counts = Self::default();
        trough.set_on_drain(bump(&counts.drains));
        trough.set_on_ball_saved(bump(&counts.saves));
        trough.set_on_all_launched(bump(&counts.all_launched));
        trough.set_on_eject_failed(bump(&counts.eject_failures));
        counts
    }
}

/// Move the clock forward to `target` in fixed ticks, firing due timers.
fn advance_to(trough: &mut SimTrough, clock: &ManualClock, target: Duration) -> u64 {
    let mut fired = 0;
    while clock.elapsed() < target {
        clock.advance(TICK.min(target - clock.elapsed()));
        fired += trough.poll() as u64;
    }
    fired
}

/// Replay `rows` against a fresh simulated machine and report the end state.
pub fn simulate(
    cfg: &Config,
    rows: &[ScenarioRow],
    launch: u32,
    ball_save: bool,
    tail: Duration,
) -> Result<SimReport> {
    cfg.validate_scenario(rows)?;

    let clock = ManualClock::new();
    let mut m = assemble(cfg, &clock)?;
    let counts = HookCounts::attach(&mut m.trough);

    if ball_save {
        m.trough.set_balls_to_save(|| 1);
        m.trough.enable_ball_save(true);
    }
    if launch > 0 {
        m.trough.request_launch(launch);
    }

    let mut report = SimReport::default();
    for row in rows {
        report.timers_fired += advance_to(&mut m.trough, &clock, Duration::from_millis(row.at_ms));
        let active = row.state.is_active();
        if m.switches.set(&row.switch, active)? {
            report.transitions += 1;
            m.trough.handle_switch(&row.switch, active);
        }
    }
    let end = clock.elapsed() + tail;
    report.timers_fired += advance_to(&mut m.trough, &clock, end);

    report.status = m.trough.snapshot();
    report.elapsed_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);
    report.drains = counts.drains.get();
    report.saves = counts.saves.get();
    report.all_launched = counts.all_launched.get();
    report.eject_failures = counts.eject_failures.get();
    report.ready_signals = m.game.ready_signals();
    report.ejects = m.coils.pulse_count(&cfg.trough.eject_coil);
    report.plunges = cfg
        .trough
        .plunge_coil
        .as_deref()
        .map_or(0, |p| m.coils.pulse_count(p));

    tracing::info!(
        elapsed_ms = report.elapsed_ms,
        transitions = report.transitions,
        balls_in_play = report.status.balls_in_play,
        "scenario finished"
    );
    Ok(report)
}

/// Parse one line of the `run` command language.
///
/// Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let input = match (verb, args.as_slice()) {
        ("switch" | "sw", [name, state]) => Input::Switch {
            name: (*name).to_string(),
            active: parse_on_off(state)?,
        },
        ("launch", [n]) => Input::Launch {
            count: parse_count(n)?,
            autoplunge: false,
        },
        ("launch", []) => Input::Launch {
            count: 1,
            autoplunge: false,
        },
        ("plunge", [n]) => Input::Launch {
            count: parse_count(n)?,
            autoplunge: true,
        },
        ("save", [state]) => Input::BallSave(parse_on_off(state)?),
        ("reset", []) => Input::ResetForBall,
        ("stop" | "quit", []) => Input::Stop,
        _ => eyre::bail!("unrecognized command '{line}'"),
    };
    Ok(Some(input))
}

fn parse_on_off(word: &str) -> Result<bool> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "active" | "1" => Ok(true),
        "off" | "inactive" | "0" => Ok(false),
        other => eyre::bail!("expected on|off, got '{other}'"),
    }
}

fn parse_count(word: &str) -> Result<u32> {
    word.parse::<u32>()
        .wrap_err_with(|| format!("invalid ball count '{word}'"))
}

/// Forward commands from `reader` to the runner until EOF, `stop`, or the
/// runner hangs up. Switch commands update the simulated matrix first.
fn pump_commands<R: BufRead>(
    reader: R,
    switches: &SimSwitches,
    has_plunger: bool,
    tx: &Sender<Input>,
) {
    for line in reader.lines() {
        let Ok(line) = line else { break };
        let input = match parse_command(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring command");
                continue;
            }
        };
        match &input {
            Input::Switch { name, active } => match switches.set(name, *active) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring command");
                    continue;
                }
            },
            Input::Launch {
                autoplunge: true, ..
            } if !has_plunger => {
                tracing::warn!("ignoring plunge: no plunge coil is configured");
                continue;
            }
            _ => {}
        }
        let stop = input == Input::Stop;
        if tx.send(input).is_err() || stop {
            break;
        }
    }
}

/// Run the controller against the wall clock, reading commands from stdin.
pub fn run_realtime(cfg: &Config, shutdown: &AtomicBool) -> Result<(RunSummary, TroughStatus)> {
    let clock = MonotonicClock::new();
    let mut m = assemble(cfg, &clock)?;
    let (tx, rx) = crossbeam_channel::unbounded();

    let switches = m.switches.clone();
    let has_plunger = cfg.trough.plunge_coil.is_some();
    std::thread::Builder::new()
        .name("trough-stdin".into())
        .spawn(move || pump_commands(std::io::stdin().lock(), &switches, has_plunger, &tx))
        .wrap_err("spawn stdin reader")?;

    let summary = runner::run(&mut m.trough, &rx, shutdown)?;
    Ok((summary, m.trough.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_language() {
        assert_eq!(
            parse_command("switch shooterLane on").unwrap(),
            Some(Input::Switch {
                name: "shooterLane".into(),
                active: true
            })
        );
        assert_eq!(
            parse_command(" plunge 2 ").unwrap(),
            Some(Input::Launch {
                count: 2,
                autoplunge: true
            })
        );
        assert_eq!(
            parse_command("launch").unwrap(),
            Some(Input::Launch {
                count: 1,
                autoplunge: false
            })
        );
        assert_eq!(parse_command("save off").unwrap(), Some(Input::BallSave(false)));
        assert_eq!(parse_command("# comment").unwrap(), None);
        assert_eq!(parse_command("").unwrap(), None);
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("launch many").is_err());
        assert!(parse_command("switch trough1 maybe").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("reset now").is_err());
    }

    #[test]
    fn pump_updates_switches_before_sending() {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(ManualClock::new());
        let switches = SimSwitches::new(clock).with_switch("lane", false);
        let (tx, rx) = crossbeam_channel::unbounded();
        let script = "switch lane on\nswitch lane on\nswitch ghost on\nplunge 1\nlaunch 2\nstop\nlaunch 9\n";

        pump_commands(script.as_bytes(), &switches, false, &tx);

        let got: Vec<Input> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                Input::Switch {
                    name: "lane".into(),
                    active: true
                },
                Input::Launch {
                    count: 2,
                    autoplunge: false
                },
                Input::Stop,
            ]
        );
        assert!(trough_traits::Switches::is_active(&switches, "lane"));
    }
}
