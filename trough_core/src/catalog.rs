//! Machine device catalog and trough wiring resolution.
//!
//! Devices are looked up by exact name first, then by tag. A tag lookup can
//! match zero, one or many devices; `Resolved` keeps that distinction explicit
//! so the "many" case is always reported instead of silently collapsed.

use crate::error::{Result, TroughError};

/// Switch and coil name (or tag) of the optional outhole kicker.
pub const OUTHOLE: &str = "outhole";
/// Tag marking switches that see a ball stuck at the trough exit.
pub const JAM_TAG: &str = "troughJam";
/// Pulse time assumed for coils declared without one.
pub const DEFAULT_PULSE_MS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEntry {
    pub name: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoilEntry {
    pub name: String,
    pub pulse_ms: u32,
    pub tags: Vec<String>,
}

/// Every switch and coil the machine declares, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    switches: Vec<SwitchEntry>,
    coils: Vec<CoilEntry>,
}

/// Outcome of a name-or-tag lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<'a> {
    None,
    One(&'a str),
    /// Several tagged devices; `first` is the earliest declared.
    Many { first: &'a str, count: usize },
}

impl<'a> Resolved<'a> {
    fn from_matches(mut it: impl Iterator<Item = &'a str>) -> Self {
        match (it.next(), it.count()) {
            (None, _) => Resolved::None,
            (Some(one), 0) => Resolved::One(one),
            (Some(first), rest) => Resolved::Many {
                first,
                count: rest + 1,
            },
        }
    }

    /// Collapse to a single name, warning when the choice was ambiguous.
    pub fn pick(self, kind: &str, key: &str) -> Option<&'a str> {
        match self {
            Resolved::None => None,
            Resolved::One(name) => Some(name),
            Resolved::Many { first, count } => {
                tracing::warn!(
                    kind,
                    tag = key,
                    count,
                    using = first,
                    "multiple devices tagged; only the first will be used"
                );
                Some(first)
            }
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_switch(mut self, name: &str, tags: &[&str]) -> Self {
        self.switches.push(SwitchEntry {
            name: name.to_string(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        });
        self
    }

    pub fn with_coil(mut self, name: &str, pulse_ms: u32, tags: &[&str]) -> Self {
        self.coils.push(CoilEntry {
            name: name.to_string(),
            pulse_ms,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        });
        self
    }

    pub fn push_switch(&mut self, entry: SwitchEntry) {
        self.switches.push(entry);
    }

    pub fn push_coil(&mut self, entry: CoilEntry) {
        self.coils.push(entry);
    }

    /// Minimal catalog containing exactly the devices a wiring names.
    pub fn from_wiring(wiring: &TroughWiring) -> Self {
        let mut cat = Self::new();
        let add_switch = |cat: &mut Self, name: &str| {
            if !cat.has_switch(name) {
                cat.switches.push(SwitchEntry {
                    name: name.to_string(),
                    tags: Vec::new(),
                });
            }
        };
        for name in &wiring.position_switches {
            add_switch(&mut cat, name);
        }
        add_switch(&mut cat, &wiring.eject_switch);
        add_switch(&mut cat, &wiring.shooter_lane_switch);
        for name in &wiring.early_save_switches {
            add_switch(&mut cat, name);
        }
        for name in std::iter::once(&wiring.eject_coil).chain(wiring.plunge_coil.iter()) {
            if !cat.has_coil(name) {
                cat.coils.push(CoilEntry {
                    name: name.clone(),
                    pulse_ms: DEFAULT_PULSE_MS,
                    tags: Vec::new(),
                });
            }
        }
        cat
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s.name == name)
    }

    pub fn has_coil(&self, name: &str) -> bool {
        self.coils.iter().any(|c| c.name == name)
    }

    pub fn coil_pulse_ms(&self, name: &str) -> Option<u32> {
        self.coils
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.pulse_ms)
    }

    /// Switches carrying `tag`, in declaration order.
    pub fn switches_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.switches
            .iter()
            .filter(move |s| s.tags.iter().any(|t| t == tag))
            .map(|s| s.name.as_str())
    }

    pub fn coils_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.coils
            .iter()
            .filter(move |c| c.tags.iter().any(|t| t == tag))
            .map(|c| c.name.as_str())
    }

    /// Exact name wins; otherwise every switch tagged `key`.
    pub fn switch_by_name_or_tag<'a>(&'a self, key: &'a str) -> Resolved<'a> {
        if let Some(s) = self.switches.iter().find(|s| s.name == key) {
            return Resolved::One(s.name.as_str());
        }
        Resolved::from_matches(self.switches_tagged(key))
    }

    pub fn coil_by_name_or_tag<'a>(&'a self, key: &'a str) -> Resolved<'a> {
        if let Some(c) = self.coils.iter().find(|c| c.name == key) {
            return Resolved::One(c.name.as_str());
        }
        Resolved::from_matches(self.coils_tagged(key))
    }
}

/// Static hardware names handed to the controller at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroughWiring {
    pub position_switches: Vec<String>,
    pub eject_switch: String,
    pub eject_coil: String,
    pub shooter_lane_switch: String,
    pub plunge_coil: Option<String>,
    pub early_save_switches: Vec<String>,
}

impl TroughWiring {
    pub fn new<I, S>(
        position_switches: I,
        eject_switch: &str,
        eject_coil: &str,
        shooter_lane: &str,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            position_switches: position_switches.into_iter().map(Into::into).collect(),
            eject_switch: eject_switch.to_string(),
            eject_coil: eject_coil.to_string(),
            shooter_lane_switch: shooter_lane.to_string(),
            plunge_coil: None,
            early_save_switches: Vec::new(),
        }
    }

    pub fn with_plunge_coil(mut self, name: &str) -> Self {
        self.plunge_coil = Some(name.to_string());
        self
    }

    pub fn with_early_save_switches<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.early_save_switches = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Wiring after every name has been checked against the catalog.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedWiring {
    pub(crate) position_switches: Vec<String>,
    pub(crate) eject_coil: String,
    pub(crate) eject_pulse_ms: u32,
    pub(crate) shooter_lane_switch: String,
    pub(crate) plunge_coil: Option<String>,
    pub(crate) early_save_switches: Vec<String>,
    /// (switch, coil) of the outhole kicker, if the machine has one.
    pub(crate) outhole: Option<(String, String)>,
    pub(crate) jam_switches: Vec<String>,
}

fn config_err(msg: String) -> eyre::Report {
    eyre::Report::new(TroughError::Config(msg))
}

/// Check the wiring against the catalog and look up the optional outhole
/// kicker and jam switches.
pub(crate) fn resolve(wiring: TroughWiring, catalog: &Catalog) -> Result<ResolvedWiring> {
    for name in wiring
        .position_switches
        .iter()
        .chain(std::iter::once(&wiring.eject_switch))
        .chain(std::iter::once(&wiring.shooter_lane_switch))
        .chain(wiring.early_save_switches.iter())
    {
        if !catalog.has_switch(name) {
            return Err(config_err(format!("switch '{name}' is not declared")));
        }
    }
    let eject_pulse_ms = catalog
        .coil_pulse_ms(&wiring.eject_coil)
        .ok_or_else(|| config_err(format!("coil '{}' is not declared", wiring.eject_coil)))?;
    if let Some(plunger) = &wiring.plunge_coil
        && !catalog.has_coil(plunger)
    {
        return Err(config_err(format!("coil '{plunger}' is not declared")));
    }

    let outhole = match catalog.switch_by_name_or_tag(OUTHOLE).pick("switch", OUTHOLE) {
        None => {
            tracing::info!(
                "no outhole switch found (name or tag); assuming the trough is fed directly"
            );
            None
        }
        Some(sw) => {
            let coil = catalog
                .coil_by_name_or_tag(OUTHOLE)
                .pick("coil", OUTHOLE)
                .ok_or_else(|| {
                    config_err(format!(
                        "outhole switch '{sw}' found but no outhole coil (name or tag)"
                    ))
                })?;
            Some((sw.to_string(), coil.to_string()))
        }
    };

    let jam_switches = catalog.switches_tagged(JAM_TAG).map(String::from).collect();

    Ok(ResolvedWiring {
        position_switches: wiring.position_switches,
        eject_coil: wiring.eject_coil,
        eject_pulse_ms,
        shooter_lane_switch: wiring.shooter_lane_switch,
        plunge_coil: wiring.plunge_coil,
        early_save_switches: wiring.early_save_switches,
        outhole,
        jam_switches,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiring() -> TroughWiring {
        TroughWiring::new(["t1", "t2", "t3"], "t1", "trough", "shooter")
    }

    #[test]
    fn exact_name_beats_tag() {
        let cat = Catalog::new()
            .with_switch("drain", &["outhole"])
            .with_switch("outhole", &[]);
        assert_eq!(cat.switch_by_name_or_tag("outhole"), Resolved::One("outhole"));
    }

    #[test]
    fn many_tagged_picks_first_declared() {
        let cat = Catalog::new()
            .with_coil("kickA", 30, &["outhole"])
            .with_coil("kickB", 30, &["outhole"]);
        let r = cat.coil_by_name_or_tag("outhole");
        assert_eq!(
            r,
            Resolved::Many {
                first: "kickA",
                count: 2
            }
        );
        assert_eq!(r.pick("coil", "outhole"), Some("kickA"));
    }

    #[test]
    fn outhole_switch_without_coil_is_config_error() {
        let cat = Catalog::from_wiring(&wiring()).with_switch("outhole", &[]);
        let err = resolve(wiring(), &cat).expect_err("must fail");
        match err.downcast_ref::<TroughError>() {
            Some(TroughError::Config(msg)) => assert!(msg.contains("outhole")),
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[test]
    fn tagged_outhole_pair_resolves() {
        let cat = Catalog::from_wiring(&wiring())
            .with_switch("drainHole", &["outhole"])
            .with_coil("drainKicker", 40, &["outhole"])
            .with_switch("jam", &[JAM_TAG]);
        let rw = resolve(wiring(), &cat).expect("resolve");
        assert_eq!(
            rw.outhole,
            Some(("drainHole".to_string(), "drainKicker".to_string()))
        );
        assert_eq!(rw.jam_switches, vec!["jam".to_string()]);
        assert_eq!(rw.eject_pulse_ms, DEFAULT_PULSE_MS);
    }

    #[test]
    fn undeclared_eject_switch_rejected() {
        let w = TroughWiring::new(["t1", "t2", "t3"], "tEject", "trough", "shooter");
        let cat = Catalog::from_wiring(&wiring());
        let err = resolve(w, &cat).expect_err("eject switch is not declared");
        assert!(err.to_string().contains("tEject"), "got: {err}");
    }

    #[test]
    fn undeclared_plunger_rejected() {
        let w = wiring().with_plunge_coil("plunger");
        let cat = Catalog::from_wiring(&wiring());
        assert!(resolve(w, &cat).is_err());
    }
}
