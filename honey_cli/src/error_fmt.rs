//! Human-readable error descriptions, exit codes and JSON error output.

use honey_core::{BuildError, DispenserError};
use serde_json::json;

/// Stable process exit codes.
pub mod exit {
    pub const GENERIC: i32 = 1;
    pub const HARDWARE: i32 = 3;
    pub const TIMEOUT: i32 = 4;
    pub const CONFIG: i32 = 5;
}

fn explain(what: &str, causes: &str, fix: &str) -> String {
    format!("What happened: {what}\nLikely causes: {causes}\nHow to fix: {fix}")
}

/// Map an eyre::Report to an explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.chain().find_map(|c| c.downcast_ref::<BuildError>()) {
        return match be {
            BuildError::MissingLoadCell => explain(
                "No load cell was provided to the dispenser.",
                "The HX711 failed to initialize or was not passed to the builder.",
                "Check the [pins] section and the HX711 wiring, then rerun.",
            ),
            BuildError::MissingValve => explain(
                "No valve actuator was provided to the dispenser.",
                "The servo failed to initialize or was not passed to the builder.",
                "Check pins.servo_pwm and the servo wiring, then rerun.",
            ),
            BuildError::InvalidConfig(msg) => explain(
                &format!("Invalid configuration ({msg})."),
                "Missing or out-of-range values in the TOML.",
                "Edit the config file, then rerun.",
            ),
        };
    }

    if let Some(de) = err
        .chain()
        .find_map(|c| c.downcast_ref::<DispenserError>())
    {
        return match de {
            DispenserError::Timeout => explain(
                "The load cell did not produce data within the configured timeout.",
                "HX711 not wired correctly, no power or ground, or the timeout is too low.",
                "Verify the DT/SCK pins and power, or raise hardware.sensor_read_timeout_ms.",
            ),
            DispenserError::Hardware(msg) | DispenserError::HardwareFault(msg) => explain(
                &format!("Hardware error ({msg})."),
                "A GPIO or PWM operation failed, or the process lacks GPIO permissions.",
                "Check [pins] and wiring; run as a user with access to /dev/gpiomem.",
            ),
            DispenserError::Config(msg) => explain(
                &format!("Configuration is invalid ({msg})."),
                "A missing section, a typo in a key, or an out-of-range value.",
                "Edit the TOML config and try again.",
            ),
            DispenserError::State(msg) => explain(
                &format!("Invalid state ({msg})."),
                "A command arrived in a state that does not accept it.",
                "Re-run with --log-level=debug for details.",
            ),
        };
    }

    let msg = err.to_string();
    let lower = format!("{err:#}").to_ascii_lowercase();
    if lower.contains("open hx711") || lower.contains("open servo") {
        return explain(
            "Failed to initialize hardware pins.",
            "Incorrect pin numbers or insufficient GPIO permissions.",
            "Fix the [pins] values in the config and make sure GPIO is accessible.",
        );
    }
    if lower.contains("open script") {
        return explain(
            &format!("Could not read the command script ({msg})."),
            "Wrong path or missing read permission.",
            "Check the --script argument.",
        );
    }

    let cause = err
        .chain()
        .nth(1)
        .map(|c| format!(" Cause: {c}"))
        .unwrap_or_default();
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Map typed errors anywhere in the chain to a stable exit code.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    for cause in err.chain() {
        if let Some(de) = cause.downcast_ref::<DispenserError>() {
            return match de {
                DispenserError::Timeout => exit::TIMEOUT,
                DispenserError::Hardware(_) | DispenserError::HardwareFault(_) => exit::HARDWARE,
                DispenserError::Config(_) => exit::CONFIG,
                DispenserError::State(_) => exit::GENERIC,
            };
        }
        if cause.downcast_ref::<BuildError>().is_some() {
            return exit::CONFIG;
        }
    }
    exit::GENERIC
}

fn reason(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        exit::TIMEOUT => "Timeout",
        exit::HARDWARE => "Hardware",
        exit::CONFIG => "Config",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({
        "type": "error",
        "reason": reason(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;
    use rstest::rstest;

    fn wrapped(e: DispenserError) -> eyre::Report {
        Err::<(), _>(eyre::Report::new(e))
            .wrap_err("control tick failed")
            .unwrap_err()
    }

    #[rstest]
    #[case(DispenserError::Timeout, exit::TIMEOUT, "timeout")]
    #[case(DispenserError::Hardware("pwm".into()), exit::HARDWARE, "Hardware error")]
    #[case(DispenserError::Config("bad".into()), exit::CONFIG, "Configuration is invalid")]
    fn typed_errors_map_to_codes(
        #[case] e: DispenserError,
        #[case] code: i32,
        #[case] needle: &str,
    ) {
        let direct = eyre::Report::new(e.clone());
        assert_eq!(exit_code_for_error(&direct), code);
        assert!(humanize(&direct).contains(needle));
        // Context wrapping keeps the code stable
        assert_eq!(exit_code_for_error(&wrapped(e)), code);
    }

    #[test]
    fn build_errors_are_config_errors() {
        let e = eyre::Report::new(BuildError::MissingValve);
        assert_eq!(exit_code_for_error(&e), exit::CONFIG);
        assert!(humanize(&e).contains("valve"));
    }

    #[test]
    fn json_error_shape() {
        let e = eyre::Report::new(DispenserError::Timeout);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Timeout");
        assert_eq!(v["exit_code"], exit::TIMEOUT);
        assert!(v["message"].as_str().unwrap().starts_with("What happened"));
    }

    #[test]
    fn unknown_errors_fall_back() {
        let e = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&e), exit::GENERIC);
        assert!(humanize(&e).contains("Original: boom"));
    }
}
