#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Machine description and scenario scripts for the trough controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Scenario CSV loader enforces headers and time ordering for the
//!   simulator's scripted switch events.
use serde::Deserialize;
use serde::de::Deserializer;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
pub struct Machine {
    /// Balls installed in the machine.
    pub num_balls: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwitchCfg {
    pub name: String,
    /// Accepts either a list (`["outhole", "drain"]`) or a comma-separated string.
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
    /// Power-on state used by the simulator.
    #[serde(default)]
    pub initial: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoilCfg {
    pub name: String,
    /// Default pulse time in ms.
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u32,
    #[serde(default, deserialize_with = "de_tags")]
    pub tags: Vec<String>,
}

fn default_pulse_ms() -> u32 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct TroughSection {
    /// One switch per ball slot, ordered from the top of the trough to the eject slot.
    pub position_switches: Vec<String>,
    pub eject_switch: String,
    pub eject_coil: String,
    pub shooter_lane_switch: String,
    pub plunge_coil: Option<String>,
    /// Switches (typically outlanes) that start a save before the ball reaches the trough.
    #[serde(default)]
    pub early_save_switches: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Timing {
    /// Quiet time required on the trough switches before counting.
    pub settle_ms: u64,
    /// How long the shooter lane must be empty before feeding another ball.
    pub shooter_inactivity_ms: u64,
    /// How long a ball must sit in the shooter lane before it counts as fed.
    pub autoplunge_settle_ms: u64,
    pub eject_watch_ms: u64,
    /// Delay before re-counting after a multi-drain or a short save count.
    pub recheck_ms: u64,
    /// Launch retry while the shooter lane is still occupied.
    pub lane_busy_retry_ms: u64,
    pub outhole_settle_ms: u64,
    pub jam_settle_ms: u64,
    /// Subtracted from the eject coil's default pulse for jam clearing.
    pub jam_pulse_margin_ms: u32,
    /// Periodic status log interval; 0 disables it.
    pub status_log_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            shooter_inactivity_ms: 2000,
            autoplunge_settle_ms: 300,
            eject_watch_ms: 4000,
            recheck_ms: 1000,
            lane_busy_retry_ms: 1000,
            outhole_settle_ms: 300,
            jam_settle_ms: 2000,
            jam_pulse_margin_ms: 5,
            status_log_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Retry {
    /// Maximum eject retries before giving up; absent means retry forever.
    pub max_eject_retries: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub machine: Machine,
    #[serde(default)]
    pub switches: Vec<SwitchCfg>,
    #[serde(default)]
    pub coils: Vec<CoilCfg>,
    pub trough: TroughSection,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub retry: Retry,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsToml {
    List(Vec<String>),
    Csv(String),
}

fn de_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<TagsToml> = Option::deserialize(deserializer)?;
    let tags = match opt {
        None => Vec::new(),
        Some(TagsToml::List(v)) => v,
        Some(TagsToml::Csv(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
    };
    Ok(tags)
}

impl Config {
    pub fn switch(&self, name: &str) -> Option<&SwitchCfg> {
        self.switches.iter().find(|s| s.name == name)
    }

    pub fn coil(&self, name: &str) -> Option<&CoilCfg> {
        self.coils.iter().find(|c| c.name == name)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Machine
        if self.machine.num_balls == 0 {
            eyre::bail!("machine.num_balls must be >= 1");
        }

        // Names
        let mut seen = HashSet::new();
        for s in &self.switches {
            if s.name.trim().is_empty() {
                eyre::bail!("switch names must not be empty");
            }
            if !seen.insert(s.name.as_str()) {
                eyre::bail!("duplicate switch name '{}'", s.name);
            }
        }
        let mut seen = HashSet::new();
        for c in &self.coils {
            if c.name.trim().is_empty() {
                eyre::bail!("coil names must not be empty");
            }
            if !seen.insert(c.name.as_str()) {
                eyre::bail!("duplicate coil name '{}'", c.name);
            }
            if c.pulse_ms == 0 || c.pulse_ms > 255 {
                eyre::bail!("coil '{}': pulse_ms must be in [1, 255]", c.name);
            }
        }

        // Trough wiring
        let t = &self.trough;
        if t.position_switches.is_empty() {
            eyre::bail!("trough.position_switches must list at least one switch");
        }
        let mut seen = HashSet::new();
        for name in &t.position_switches {
            if !seen.insert(name.as_str()) {
                eyre::bail!("trough.position_switches lists '{name}' twice");
            }
        }
        for name in t
            .position_switches
            .iter()
            .chain(std::iter::once(&t.eject_switch))
            .chain(std::iter::once(&t.shooter_lane_switch))
            .chain(t.early_save_switches.iter())
        {
            if self.switch(name).is_none() {
                eyre::bail!("trough refers to undeclared switch '{name}'");
            }
        }
        if !t.position_switches.contains(&t.eject_switch) {
            eyre::bail!("trough.eject_switch must be one of trough.position_switches");
        }
        if self.coil(&t.eject_coil).is_none() {
            eyre::bail!("trough refers to undeclared coil '{}'", t.eject_coil);
        }
        if let Some(plunger) = &t.plunge_coil
            && self.coil(plunger).is_none()
        {
            eyre::bail!("trough refers to undeclared coil '{plunger}'");
        }

        // Timing
        let tm = &self.timing;
        if tm.shooter_inactivity_ms == 0 {
            eyre::bail!("timing.shooter_inactivity_ms must be >= 1");
        }
        if tm.eject_watch_ms == 0 {
            eyre::bail!("timing.eject_watch_ms must be >= 1");
        }
        if tm.recheck_ms == 0 {
            eyre::bail!("timing.recheck_ms must be >= 1");
        }
        if tm.lane_busy_retry_ms == 0 {
            eyre::bail!("timing.lane_busy_retry_ms must be >= 1");
        }
        if tm.settle_ms > 10_000 {
            eyre::bail!("timing.settle_ms is unreasonably large (>10s)");
        }

        // Retry
        if self.retry.max_eject_retries == Some(0) {
            eyre::bail!("retry.max_eject_retries must be >= 1 (omit it to retry forever)");
        }

        // Logging
        if let Some(level) = &self.logging.level
            && !matches!(
                level.to_ascii_lowercase().as_str(),
                "error" | "warn" | "info" | "debug" | "trace"
            )
        {
            eyre::bail!("logging.level must be one of error|warn|info|debug|trace");
        }
        if let Some(rot) = &self.logging.rotation
            && !matches!(rot.to_ascii_lowercase().as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// Scenario CSV schema.
///
/// Expected headers:
/// at_ms,switch,state
///
/// Example:
/// at_ms,switch,state
/// 0,trough1,inactive
/// 450,shooterLane,active
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScenarioRow {
    pub at_ms: u64,
    pub switch: String,
    pub state: SwitchState,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwitchState {
    Active,
    Inactive,
}

impl SwitchState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

pub fn load_scenario_csv(path: &std::path::Path) -> eyre::Result<Vec<ScenarioRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open scenario CSV {:?}: {}", path, e))?;
    read_scenario(rdr)
}

/// Parse a scenario from any reader (used by tests and the fuzz target).
pub fn parse_scenario(text: &str) -> eyre::Result<Vec<ScenarioRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    read_scenario(rdr)
}

fn read_scenario<R: std::io::Read>(mut rdr: csv::Reader<R>) -> eyre::Result<Vec<ScenarioRow>> {
    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {}", e))?
        .clone();
    let expected = ["at_ms", "switch", "state"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "scenario CSV must have headers 'at_ms,switch,state', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<ScenarioRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<ScenarioRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if let Some(prev) = rows.last()
            && row.at_ms < prev.at_ms
        {
            eyre::bail!(
                "scenario rows must be in time order (row {} at {} ms precedes {} ms)",
                idx + 2,
                row.at_ms,
                prev.at_ms
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

impl Config {
    /// Check every switch named in a scenario is declared.
    pub fn validate_scenario(&self, rows: &[ScenarioRow]) -> eyre::Result<()> {
        for (idx, row) in rows.iter().enumerate() {
            if self.switch(&row.switch).is_none() {
                eyre::bail!(
                    "scenario row {} refers to undeclared switch '{}'",
                    idx + 2,
                    row.switch
                );
            }
        }
        Ok(())
    }
}
