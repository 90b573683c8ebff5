#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Accepted scripts are always in time order.
    if let Ok(rows) = trough_config::parse_scenario(data) {
        assert!(rows.windows(2).all(|w| w[0].at_ms <= w[1].at_ms));
    }
});
