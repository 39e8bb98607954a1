//! Human-readable error descriptions and structured JSON error formatting.

use crate::cli::LAST_SAFETY;
use crate::drive::{SIM_STALL_ENV, abort_reason_name};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use drive_core::error::{AbortReason, BuildError, DriveError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEncoders => {
                "What happened: No encoders were provided to the controller.\nLikely causes: The drivetrain failed to initialize or was not wired into the builder.\nHow to fix: Ensure the encoders are created successfully and passed via with_encoders(...).".to_string()
            }
            BuildError::MissingDrive => {
                "What happened: No motor drive was provided to the controller.\nLikely causes: The motor driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the drive is created successfully and passed via with_drive(...).".to_string()
            }
            BuildError::MissingTarget => {
                "What happened: Target position not set.\nLikely causes: The CLI did not pass --ticks or the builder was not configured.\nHow to fix: Provide the target (e.g., `autodrive drive --ticks 1000`).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/drive_config.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DriveError>() {
        return match de {
            DriveError::Timeout {
                elapsed_ms,
                max_run_ms,
            } => format!(
                "What happened: Target not reached within the max run time ({elapsed_ms} ms of {max_run_ms} ms).\nLikely causes: Stalled or blocked wheels, gains too low, or a tolerance tighter than the drivetrain can hold.\nHow to fix: Check the wheels for obstructions, raise the position kp, widen control.tolerance_ticks, or increase safety.max_run_ms / --max-run-ms."
            ),
            DriveError::Abort(AbortReason::Cancelled) => {
                "What happened: The move was cancelled.\nLikely causes: Ctrl-C or a supervisor requested a stop.\nHow to fix: Start a new move when ready.".to_string()
            }
            DriveError::Abort(AbortReason::Stalled) => format!(
                "What happened: Stall watchdog tripped; the position stopped changing while away from the target.\nLikely causes: Jammed wheels, motor power cut, or encoders disconnected ({SIM_STALL_ENV} in simulation).\nHow to fix: Check mechanics and wiring; adjust safety.stall_ticks / safety.stall_ms in the config if needed."
            ),
            DriveError::HardwareFault(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: Encoder or motor driver reported a fault condition.\nHow to fix: Power-cycle the drivetrain and check wiring before retrying."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config") {
        return format!(
            "What happened: Could not read the config file.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass an existing TOML file via --config. Original: {msg}"
        );
    }

    if lower.contains("parsing config") || lower.contains("must be") {
        let detail = err
            .chain()
            .last()
            .map_or_else(|| msg.clone(), ToString::to_string);
        return format!(
            "What happened: Configuration is invalid ({detail}).\nLikely causes: Out-of-range values or unknown keys in the TOML.\nHow to fix: Edit the TOML config and try again."
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

/// Stable exit codes: cancelled 2, stalled 3, timeout 4, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use drive_core::error::{AbortReason, DriveError};
    match err.downcast_ref::<DriveError>() {
        Some(DriveError::Abort(AbortReason::Cancelled)) => 2,
        Some(DriveError::Abort(AbortReason::Stalled)) => 3,
        Some(DriveError::Timeout { .. }) => 4,
        _ => 1,
    }
}

/// Short machine-readable name for the failure, used as `reason` in JSON.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    use drive_core::error::DriveError;
    match err.downcast_ref::<DriveError>() {
        Some(DriveError::Abort(r)) => abort_reason_name(r),
        Some(DriveError::Timeout { .. }) => "Timeout",
        Some(DriveError::Hardware(_) | DriveError::HardwareFault(_)) => "Hardware",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use drive_core::error::{AbortReason, DriveError};
    use serde_json::json;

    let details = LAST_SAFETY.get();
    let detail_obj = match err.downcast_ref::<DriveError>() {
        Some(DriveError::Timeout {
            elapsed_ms,
            max_run_ms,
        }) => Some(json!({ "max_run_ms": max_run_ms, "elapsed_ms": elapsed_ms })),
        Some(DriveError::Abort(AbortReason::Stalled)) => {
            details.map(|s| json!({ "stall_ticks": s.stall_ticks, "stall_ms": s.stall_ms }))
        }
        _ => None,
    };

    let reason = reason_name(err);
    let msg = humanize(err);
    let obj = if let Some(d) = detail_obj {
        json!({ "reason": reason, "details": d, "message": msg })
    } else {
        json!({ "reason": reason, "message": msg })
    };
    obj.to_string()
}
