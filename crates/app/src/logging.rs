//! Stderr logging bootstrap for the binary.

use flexi_logger::{Logger, LoggerHandle};
use log::info;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Starts `flexi_logger` on stderr. Keep the returned handle alive for the
/// lifetime of the process.
///
/// # Errors
///
/// Returns a readable message when the level is unsupported or the backend
/// fails to start.
pub fn init_logging(level: &str) -> Result<LoggerHandle, String> {
    let level = normalize_level(level)?;
    let handle = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    info!(
        "event=app_start module=app status=ok level={level} version={}",
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok("off"),
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected off|trace|debug|info|warn|error"
        )),
    }
}
