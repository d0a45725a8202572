//! Human-readable error descriptions and structured JSON error formatting.

use serde_json::json;
use thermocal_core::{AbortReason, BuildError, InstrumentError};

fn explain(what: &str, causes: &str, fix: &str) -> String {
    format!("What happened: {what}\nLikely causes: {causes}\nHow to fix: {fix}")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingAdc => explain(
                "No ADC was provided to the instrument.",
                "The thermistor channel failed to initialize or was not wired into the builder.",
                "Pass the ADC via with_adc(...).",
            ),
            BuildError::MissingProbe => explain(
                "No reference probe was provided to the instrument.",
                "The 1-wire bus failed to initialize or the probe was not wired into the builder.",
                "Pass the probe via with_probe(...).",
            ),
            BuildError::MissingLog => explain(
                "No data log was provided to the instrument.",
                "Storage failed to initialize or the log was not wired into the builder.",
                "Pass a log via with_log(...).",
            ),
            BuildError::InvalidConfig(msg) => explain(
                &format!("Invalid configuration ({msg})."),
                "Missing or out-of-range values in the TOML.",
                "Edit the config file, then rerun `thermocal self-check`.",
            ),
        };
    }

    if let Some(ie) = err.downcast_ref::<InstrumentError>() {
        return match ie {
            InstrumentError::Abort(reason) => humanize_abort(reason),
            InstrumentError::Config(msg) => explain(
                &format!("Invalid configuration ({msg})."),
                "Missing or out-of-range values in the TOML.",
                "Edit the config file, then rerun `thermocal self-check`.",
            ),
            InstrumentError::Hardware(msg) | InstrumentError::HardwareFault(msg) => explain(
                &format!("Hardware error ({msg})."),
                "Wiring, power or permissions on the peripheral.",
                "Check the [pins] section and the wiring, then re-run with --log-level=debug.",
            ),
        };
    }

    // String-based heuristics for errors coming from init, config or fitting
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("parse config") || lower.starts_with("read config") {
        return explain(
            &format!("The config file could not be loaded ({msg})."),
            "TOML syntax error, a misspelled key or a value of the wrong type.",
            "Fix the file; omitted keys fall back to the bench defaults.",
        );
    }

    if lower.contains("recorded run csv must have headers") {
        return explain(
            "The CSV is not a recorded run.",
            "It was not written by a record session, or its header was edited.",
            "Use the file written by RECORD_DATA mode (record.file in the config).",
        );
    }

    if lower.starts_with("upper side") || lower.starts_with("lower side") {
        return explain(
            &format!("Not enough data to fit one side of the cutoff ({msg})."),
            "The run did not cover the temperature range on that side of the cutoff.",
            "Record over a wider range or pass a different --cutoff.",
        );
    }

    if lower.contains("gpio") {
        return explain(
            &format!("Failed to initialize GPIO ({msg})."),
            "Incorrect pin numbers or insufficient GPIO permissions.",
            "Fix the [pins] values in the config; ensure the process can access GPIO.",
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

fn humanize_abort(reason: &AbortReason) -> String {
    match reason {
        AbortReason::SensorDisconnected => explain(
            "The reference probe stopped answering; the session was abandoned.",
            "Probe unplugged, a broken 1-wire lead or a missing pull-up.",
            "Reseat the probe and check the data line, then start the mode again.",
        ),
        AbortReason::StorageUnavailable(msg) => explain(
            &format!("The record file could not be opened ({msg})."),
            "Storage not mounted, a missing directory or no write permission.",
            "Check record.file in the config and that its directory exists.",
        ),
        AbortReason::StorageWrite(msg) => explain(
            &format!("Writing to the record file failed ({msg})."),
            "Storage full or removed during the session.",
            "Free space or reinsert the card, then record again.",
        ),
        AbortReason::CadenceOverrun => explain(
            "Data collection took longer than the sampling interval during a record session.",
            "Sample size too large for sampling.data_interval_ms.",
            "Choose a smaller SAMPLE_SIZE or increase sampling.data_interval_ms.",
        ),
        AbortReason::Adc(msg) => explain(
            &format!("The thermistor ADC read failed ({msg})."),
            "ADC channel misconfigured or the divider is disconnected.",
            "Check the thermistor wiring and pins.thermistor_adc.",
        ),
    }
}

/// Stable identifier for an abort reason, used in JSON output.
pub fn abort_reason_name(reason: &AbortReason) -> &'static str {
    match reason {
        AbortReason::SensorDisconnected => "SensorDisconnected",
        AbortReason::StorageUnavailable(_) => "StorageUnavailable",
        AbortReason::StorageWrite(_) => "StorageWrite",
        AbortReason::CadenceOverrun => "CadenceOverrun",
        AbortReason::Adc(_) => "Adc",
    }
}

/// Map AbortReason (if present) to stable exit codes; config errors return 2, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<InstrumentError>() {
        Some(InstrumentError::Abort(reason)) => match reason {
            AbortReason::SensorDisconnected => 3,
            AbortReason::StorageUnavailable(_) => 4,
            AbortReason::StorageWrite(_) => 5,
            AbortReason::CadenceOverrun => 6,
            AbortReason::Adc(_) => 7,
        },
        Some(InstrumentError::Config(_)) => 2,
        _ if err.downcast_ref::<BuildError>().is_some() => 2,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let reason = match err.downcast_ref::<InstrumentError>() {
        Some(InstrumentError::Abort(r)) => abort_reason_name(r),
        Some(InstrumentError::Config(_)) => "Config",
        Some(InstrumentError::Hardware(_) | InstrumentError::HardwareFault(_)) => "Hardware",
        None if err.downcast_ref::<BuildError>().is_some() => "Config",
        None => "Error",
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}
