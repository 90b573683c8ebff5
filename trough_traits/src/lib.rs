pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Duration;

/// Result type used at the hardware trait boundary.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Read side of the switch registry: debounced state per named switch.
pub trait Switches {
    fn is_active(&self, name: &str) -> bool;

    /// Time since the switch last changed state.
    fn time_since_change(&self, name: &str) -> Duration;

    /// True when the switch is inactive and has been for at least `for_at_least`.
    fn is_inactive_for(&self, name: &str, for_at_least: Duration) -> bool {
        !self.is_active(name) && self.time_since_change(name) >= for_at_least
    }
}

/// Named actuators. A pulse is fire-and-forget; `None` uses the coil's default time.
pub trait Coils {
    fn pulse(&mut self, name: &str, duration_ms: Option<u32>) -> HwResult<()>;
}

/// The parts of the running game the trough needs to consult.
pub trait GameContext {
    /// Number of balls installed in the machine.
    fn total_balls(&self) -> u32;
    fn is_tilted(&self) -> bool;
    /// A game (or ball) start is waiting for all balls to come home.
    fn game_start_pending(&self) -> bool;
    /// Called once the trough is full while a start is pending.
    fn ready_to_start(&mut self);
}

impl<T: Switches + ?Sized> Switches for Box<T> {
    fn is_active(&self, name: &str) -> bool {
        (**self).is_active(name)
    }
    fn time_since_change(&self, name: &str) -> Duration {
        (**self).time_since_change(name)
    }
    fn is_inactive_for(&self, name: &str, for_at_least: Duration) -> bool {
        (**self).is_inactive_for(name, for_at_least)
    }
}

impl<T: Coils + ?Sized> Coils for Box<T> {
    fn pulse(&mut self, name: &str, duration_ms: Option<u32>) -> HwResult<()> {
        (**self).pulse(name, duration_ms)
    }
}

impl<T: GameContext + ?Sized> GameContext for Box<T> {
    fn total_balls(&self) -> u32 {
        (**self).total_balls()
    }
    fn is_tilted(&self) -> bool {
        (**self).is_tilted()
    }
    fn game_start_pending(&self) -> bool {
        (**self).game_start_pending()
    }
    fn ready_to_start(&mut self) {
        (**self).ready_to_start();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports every switch inactive for long enough, whatever the timestamps say.
    struct AlwaysSettled;

    impl Switches for AlwaysSettled {
        fn is_active(&self, _name: &str) -> bool {
            false
        }
        fn time_since_change(&self, _name: &str) -> Duration {
            Duration::ZERO
        }
        fn is_inactive_for(&self, _name: &str, _for_at_least: Duration) -> bool {
            true
        }
    }

    #[test]
    fn boxed_switches_keep_overrides() {
        let boxed: Box<dyn Switches> = Box::new(AlwaysSettled);
        assert!(boxed.is_inactive_for("shooter", Duration::from_secs(2)));
    }
}
