//! Human-readable error descriptions and structured JSON error formatting.

use trough_core::error::{BuildError, TroughError};
use trough_hardware::error::HwError;

/// Stable name for the typed error at the root of `err`, if any.
pub fn error_reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSwitches
            | BuildError::MissingCoils
            | BuildError::MissingGame
            | BuildError::MissingWiring => "MissingComponent",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    if let Some(te) = err.downcast_ref::<TroughError>() {
        return match te {
            TroughError::Config(_) => "Config",
            TroughError::Hardware(_) | TroughError::HardwareFault(_) => "Hardware",
            TroughError::State(_) => "State",
        };
    }
    if err.downcast_ref::<HwError>().is_some() {
        return "Hardware";
    }
    "Error"
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSwitches | BuildError::MissingCoils | BuildError::MissingGame => format!(
                "What happened: The controller was built without a required component ({be}).\nLikely causes: Simulated hardware failed to initialize.\nHow to fix: Re-run with --log-level=debug and report the output."
            ),
            BuildError::MissingWiring => {
                "What happened: No trough wiring was provided.\nLikely causes: The [trough] section did not reach the builder.\nHow to fix: Check the [trough] section of the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `trough check`."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TroughError>() {
        return match te {
            TroughError::Config(msg) => format!(
                "What happened: {msg}.\nLikely causes: The machine wiring does not support the requested operation.\nHow to fix: Add the missing device to the config or use a different command."
            ),
            TroughError::State(msg) => format!(
                "What happened: {msg}.\nLikely causes: The controller was stopped before this command.\nHow to fix: Start a new run."
            ),
            TroughError::Hardware(_) | TroughError::HardwareFault(_) => format!(
                "What happened: {te}.\nLikely causes: A coil or switch is unknown to the hardware layer.\nHow to fix: Make sure every device in [trough] is declared in [[switches]] or [[coils]]."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return format!(
            "What happened: {hw}.\nLikely causes: The scenario or command names a device the machine does not declare.\nHow to fix: Check spelling against [[switches]] and [[coils]] in the config."
        );
    }

    // String-based heuristics for errors coming from config or scenario loading
    let msg = err.to_string();
    let chain = format!("{err:#}");
    let lower = chain.to_ascii_lowercase();

    if lower.contains("read config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass an existing file with --config. Original: {msg}"
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML for a trough machine.\nLikely causes: A required section ([machine], [trough]) is missing or a value has the wrong type.\nHow to fix: Compare with etc/trough.toml. Original: {chain}"
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({}).\nLikely causes: Undeclared device names or out-of-range timings.\nHow to fix: Edit the TOML config and run `trough check` again.",
            err.root_cause()
        );
    }

    // Scenario CSV header special-case
    if lower.contains("scenario csv must have headers") {
        return "Invalid headers in scenario CSV. Expected 'at_ms,switch,state'.".to_string();
    }

    if lower.contains("scenario") {
        return format!(
            "What happened: The scenario script was rejected.\nLikely causes: Bad row, rows out of time order, or an undeclared switch.\nHow to fix: Fix the CSV and rerun. Original: {chain}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family; anything untyped returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match error_reason_name(err) {
        "MissingComponent" | "InvalidConfig" | "Config" => 3,
        "Hardware" => 4,
        "State" => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": error_reason_name(err),
        "message": humanize(err),
        "chain": err.chain().map(ToString::to_string).collect::<Vec<_>>(),
    })
    .to_string()
}
