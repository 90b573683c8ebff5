#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use trough_core::{build_trough, Catalog, RetryPolicy, TimingCfg, TroughG, TroughWiring};
use trough_hardware::{SimCoils, SimGame, SimSwitches};
use trough_traits::{ManualClock, Switches};

pub const POSITIONS: [&str; 3] = ["trough1", "trough2", "trough3"];
pub const SHOOTER: &str = "shooter";
pub const EJECT: &str = "trough";
pub const PLUNGER: &str = "plunger";

/// Time step used when advancing the manual clock.
pub const TICK: Duration = Duration::from_millis(10);

pub fn wiring() -> TroughWiring {
    TroughWiring::new(POSITIONS, POSITIONS[0], EJECT, SHOOTER).with_plunge_coil(PLUNGER)
}

/// Counters bumped by the controller's hooks.
#[derive(Default, Clone)]
pub struct Calls {
    pub drains: Rc<Cell<u32>>,
    pub saves: Rc<Cell<u32>>,
    pub all_launched: Rc<Cell<u32>>,
    pub eject_failed: Rc<Cell<u32>>,
    pub log: Rc<RefCell<Vec<&'static str>>>,
}

pub struct Rig {
    pub clock: ManualClock,
    pub switches: SimSwitches,
    pub coils: SimCoils,
    pub game: SimGame,
    pub trough: TroughG<SimSwitches, SimCoils, SimGame>,
    pub calls: Calls,
}

pub struct RigOpts {
    pub total_balls: u32,
    pub in_trough: usize,
    pub catalog: Catalog,
    pub wiring: TroughWiring,
    /// Switches the catalog declares beyond the wiring.
    pub extra_switches: Vec<&'static str>,
    /// Coils the catalog declares beyond the wiring, with pulse times.
    pub extra_coils: Vec<(&'static str, u32)>,
    pub timing: TimingCfg,
    pub retry: RetryPolicy,
}

impl Default for RigOpts {
    fn default() -> Self {
        let wiring = wiring();
        Self {
            total_balls: 3,
            in_trough: 3,
            catalog: Catalog::from_wiring(&wiring),
            wiring,
            extra_switches: Vec::new(),
            extra_coils: Vec::new(),
            timing: TimingCfg::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Rig {
    pub fn new() -> Self {
        Self::with(RigOpts::default())
    }

    pub fn with(opts: RigOpts) -> Self {
        let clock = ManualClock::new();
        let shared: Arc<dyn trough_traits::Clock + Send + Sync> = Arc::new(clock.clone());

        let switches = SimSwitches::new(shared.clone());
        for (i, name) in opts.wiring.position_switches.iter().enumerate() {
            switches.register(name, i < opts.in_trough);
        }
        switches.register(&opts.wiring.shooter_lane_switch, false);
        for name in opts
            .wiring
            .early_save_switches
            .iter()
            .map(String::as_str)
            .chain(opts.extra_switches.iter().copied())
        {
            switches.register(name, false);
        }

        let mut coils = SimCoils::new(shared).with_coil(EJECT, 30).with_coil(PLUNGER, 20);
        for (name, ms) in &opts.extra_coils {
            coils = coils.with_coil(name, *ms);
        }

        let game = SimGame::new(opts.total_balls);

        let mut trough = build_trough(
            switches.clone(),
            coils.clone(),
            game.clone(),
            opts.wiring,
            Some(opts.catalog),
            opts.timing,
            Some(opts.retry),
            Some(Box::new(clock.clone())),
        )
        .expect("build trough");

        let calls = Calls::default();
        let c = calls.drains.clone();
        trough.set_on_drain(move || c.set(c.get() + 1));
        let c = calls.saves.clone();
        trough.set_on_ball_saved(move || c.set(c.get() + 1));
        let c = calls.all_launched.clone();
        let log = calls.log.clone();
        trough.set_on_all_launched(move || {
            c.set(c.get() + 1);
            log.borrow_mut().push("all");
        });
        let c = calls.eject_failed.clone();
        trough.set_on_eject_failed(move || c.set(c.get() + 1));

        Self {
            clock,
            switches,
            coils,
            game,
            trough,
            calls,
        }
    }

    /// Change a switch and deliver the transition if it actually changed.
    pub fn set(&mut self, name: &str, active: bool) {
        if self.switches.set(name, active).expect("known switch") {
            self.trough.handle_switch(name, active);
        }
    }

    /// Advance the clock in small ticks, polling after each one.
    pub fn run_for(&mut self, ms: u64) {
        let steps = ms / TICK.as_millis() as u64;
        for _ in 0..steps {
            self.clock.advance(TICK);
            self.trough.poll();
        }
    }

    pub fn ejects(&self) -> usize {
        self.coils.pulse_count(EJECT)
    }

    pub fn plunges(&self) -> usize {
        self.coils.pulse_count(PLUNGER)
    }

    /// A ball rolls into the first empty trough slot.
    pub fn drain_ball(&mut self) {
        let slot = POSITIONS
            .iter()
            .copied()
            .find(|p| !self.switches.is_active(p))
            .expect("trough has room");
        self.set(slot, true);
    }

    /// The ejected ball leaves the trough, reaches the shooter lane, rests
    /// long enough to count as fed, and is shot onto the playfield.
    pub fn ball_to_lane(&mut self) {
        let slot = POSITIONS
            .iter()
            .copied()
            .rev()
            .find(|p| self.switches.is_active(p))
            .expect("trough has a ball");
        self.set(slot, false);
        self.run_for(600);
        self.set(SHOOTER, true);
        self.run_for(400);
        self.set(SHOOTER, false);
    }

    /// Launch one ball from a full trough and get it onto the playfield.
    pub fn start_ball(&mut self) {
        self.trough.request_launch(1);
        self.ball_to_lane();
        assert_eq!(self.trough.balls_in_play(), 1);
    }
}
