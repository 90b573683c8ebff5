#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Machine TOML must either parse or fail cleanly; validate() must never panic.
    if let Ok(cfg) = trough_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
