//! Type-state builder for `Trough` and generic `build_trough` constructor.
//!
//! The builder enforces at compile time that switches, coils, and a game
//! context are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use trough_traits::clock::{Clock, MonotonicClock};
use trough_traits::{Coils, GameContext, Switches};

use crate::catalog::{resolve, Catalog, TroughWiring};
use crate::config::{RetryPolicy, TimingCfg};
use crate::error::{BuildError, Result};
use crate::trough::TroughController;

/// Dynamically dispatched controller, as produced by the builder.
pub type Trough =
    TroughController<Box<dyn Switches>, Box<dyn Coils>, Box<dyn GameContext>>;

/// Generic, statically-dispatched alias.
pub type TroughG<S, C, G> = TroughController<S, C, G>;

impl Trough {
    /// Start building a controller.
    pub fn builder() -> TroughBuilder<Missing, Missing, Missing> {
        TroughBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Trough`. Everything is validated on `build()`.
pub struct TroughBuilder<S, C, G> {
    switches: Option<Box<dyn Switches>>,
    coils: Option<Box<dyn Coils>>,
    game: Option<Box<dyn GameContext>>,
    wiring: Option<TroughWiring>,
    catalog: Option<Catalog>,
    timing: Option<TimingCfg>,
    retry: Option<RetryPolicy>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    on_drain: Option<Box<dyn FnMut()>>,
    _s: PhantomData<S>,
    _c: PhantomData<C>,
    _g: PhantomData<G>,
}

impl Default for TroughBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            switches: None,
            coils: None,
            game: None,
            wiring: None,
            catalog: None,
            timing: None,
            retry: None,
            clock: None,
            on_drain: None,
            _s: PhantomData,
            _c: PhantomData,
            _g: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and construct a controller.
///
/// Shared by `TroughBuilder::try_build()` and `build_trough()`.
#[allow(clippy::too_many_arguments)]
fn validate_and_build<S: Switches, C: Coils, G: GameContext>(
    switches: S,
    coils: C,
    game: G,
    wiring: TroughWiring,
    catalog: Option<Catalog>,
    timing: TimingCfg,
    retry: RetryPolicy,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TroughController<S, C, G>> {
    // ── Validation ───────────────────────────────────────────────────────────
    if wiring.position_switches.is_empty() {
        return Err(invalid("at least one trough position switch is required"));
    }
    if timing.settle > Duration::from_secs(10) {
        return Err(invalid("settle time must be <= 10 s"));
    }
    if timing.shooter_inactivity.is_zero() {
        return Err(invalid("shooter inactivity threshold must be > 0"));
    }
    if timing.eject_watch.is_zero() {
        return Err(invalid("eject watchdog period must be > 0"));
    }
    if timing.recheck.is_zero() || timing.lane_busy_retry.is_zero() {
        return Err(invalid("retry delays must be > 0"));
    }
    if timing.status_log.is_some_and(|d| d.is_zero()) {
        return Err(invalid("status log period must be > 0 when enabled"));
    }
    if retry.max_retries == Some(0) {
        return Err(invalid("max eject retries must be >= 1 when bounded"));
    }

    // ── Resolve names ────────────────────────────────────────────────────────
    let catalog = catalog.unwrap_or_else(|| Catalog::from_wiring(&wiring));
    let wiring = resolve(wiring, &catalog)?;

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };

    tracing::debug!(
        positions = wiring.position_switches.len(),
        outhole = wiring.outhole.is_some(),
        jam_switches = wiring.jam_switches.len(),
        "trough controller built"
    );

    Ok(TroughController::new(
        switches, coils, game, wiring, timing, retry, clock,
    ))
}

impl<S, C, G> TroughBuilder<S, C, G> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Trough> {
        let switches = self
            .switches
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSwitches))?;
        let coils = self
            .coils
            .ok_or_else(|| eyre::Report::new(BuildError::MissingCoils))?;
        let game = self
            .game
            .ok_or_else(|| eyre::Report::new(BuildError::MissingGame))?;
        let wiring = self
            .wiring
            .ok_or_else(|| eyre::Report::new(BuildError::MissingWiring))?;

        let mut trough = validate_and_build(
            switches,
            coils,
            game,
            wiring,
            self.catalog,
            self.timing.unwrap_or_default(),
            self.retry.unwrap_or_default(),
            self.clock,
        )?;
        trough.hooks.on_drain = self.on_drain;
        Ok(trough)
    }
}

/// Chainable setters that do not affect type-state.
impl<S, C, G> TroughBuilder<S, C, G> {
    pub fn with_wiring(mut self, wiring: TroughWiring) -> Self {
        self.wiring = Some(wiring);
        self
    }
    /// Device catalog used to validate names and find the outhole and jam switches.
    /// Defaults to exactly the devices the wiring names.
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }
    pub fn with_on_drain<F>(mut self, f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_drain = Some(Box::new(f));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<C, G> TroughBuilder<Missing, C, G> {
    pub fn with_switches(self, switches: impl Switches + 'static) -> TroughBuilder<Set, C, G> {
        TroughBuilder {
            switches: Some(Box::new(switches)),
            coils: self.coils,
            game: self.game,
            wiring: self.wiring,
            catalog: self.catalog,
            timing: self.timing,
            retry: self.retry,
            clock: self.clock,
            on_drain: self.on_drain,
            _s: PhantomData,
            _c: PhantomData,
            _g: PhantomData,
        }
    }
}

impl<S, G> TroughBuilder<S, Missing, G> {
    pub fn with_coils(self, coils: impl Coils + 'static) -> TroughBuilder<S, Set, G> {
        TroughBuilder {
            switches: self.switches,
            coils: Some(Box::new(coils)),
            game: self.game,
            wiring: self.wiring,
            catalog: self.catalog,
            timing: self.timing,
            retry: self.retry,
            clock: self.clock,
            on_drain: self.on_drain,
            _s: PhantomData,
            _c: PhantomData,
            _g: PhantomData,
        }
    }
}

impl<S, C> TroughBuilder<S, C, Missing> {
    pub fn with_game(self, game: impl GameContext + 'static) -> TroughBuilder<S, C, Set> {
        TroughBuilder {
            switches: self.switches,
            coils: self.coils,
            game: Some(Box::new(game)),
            wiring: self.wiring,
            catalog: self.catalog,
            timing: self.timing,
            retry: self.retry,
            clock: self.clock,
            on_drain: self.on_drain,
            _s: PhantomData,
            _c: PhantomData,
            _g: PhantomData,
        }
    }
}

impl TroughBuilder<Set, Set, Set> {
    /// Validate and build. Only available once switches, coils, and game are set.
    pub fn build(self) -> Result<Trough> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched `TroughG` from concrete hardware.
///
/// Delegates to the shared `validate_and_build`.
#[allow(clippy::too_many_arguments)]
pub fn build_trough<S, C, G>(
    switches: S,
    coils: C,
    game: G,
    wiring: TroughWiring,
    catalog: Option<Catalog>,
    timing: TimingCfg,
    retry: Option<RetryPolicy>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<TroughG<S, C, G>>
where
    S: Switches + 'static,
    C: Coils + 'static,
    G: GameContext + 'static,
{
    validate_and_build(
        switches,
        coils,
        game,
        wiring,
        catalog,
        timing,
        retry.unwrap_or_default(),
        clock,
    )
}
