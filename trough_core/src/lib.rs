#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Pinball ball-trough controller (hardware-agnostic).
//!
//! All hardware interaction goes through the `trough_traits::Switches`,
//! `trough_traits::Coils` and `trough_traits::GameContext` traits.
//!
//! ## Architecture
//!
//! - **Reconciler**: counts the trough after its switches settle and decides
//!   drain, save, or nothing (`trough::evaluate`)
//! - **Launch sequencer**: FIFO of launch requests fed one ball at a time,
//!   with an eject watchdog (`launch` module, `TroughController`)
//! - **Auxiliary handlers**: outhole auto-kick, jam clearing, early ball save
//! - **Timers**: per-controller named one-shot timers (`timers` module)
//! - **Wiring**: name-or-tag device lookup (`catalog` module)
//! - **Runner**: channel-driven real-time loop (`runner` module)
//!
//! Nothing here sleeps or spawns threads; call `poll()` whenever time moves.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod launch;
pub mod runner;
pub mod status;
pub mod timers;
pub mod trough;

pub use builder::{build_trough, Missing, Set, Trough, TroughBuilder, TroughG};
pub use catalog::{Catalog, Resolved, TroughWiring};
pub use config::{RetryPolicy, TimingCfg};
pub use error::{BuildError, Result, TroughError};
pub use launch::{LaunchCallback, LaunchRequest};
pub use status::TroughStatus;
pub use timers::TimerId;
pub use trough::{LaunchOptions, TroughController};
