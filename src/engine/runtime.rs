use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Error, Result};

/// Engines in probe order when none is requested explicitly.
pub const SUPPORTED_ENGINES: [&str; 2] = ["podman", "docker"];

/// Pick the container engine binary to drive.
///
/// An explicitly requested engine must be supported and respond to
/// `--version`; otherwise the first supported engine that responds wins.
pub fn resolve_runtime(preferred: Option<&str>) -> Result<String> {
    if let Some(name) = preferred {
        if !SUPPORTED_ENGINES.contains(&name) {
            return Err(Error::RuntimeUnavailable(format!(
                "unsupported engine '{name}' (expected one of: {})",
                SUPPORTED_ENGINES.join(", ")
            )));
        }
        if !responds(name) {
            return Err(Error::RuntimeUnavailable(format!(
                "`{name}` is not installed or not on PATH"
            )));
        }
        return Ok(name.to_string());
    }

    SUPPORTED_ENGINES
        .iter()
        .find(|name| responds(name))
        .map(|name| name.to_string())
        .ok_or_else(|| {
            Error::RuntimeUnavailable(format!(
                "none of {} found on PATH",
                SUPPORTED_ENGINES.join(", ")
            ))
        })
}

fn responds(program: &str) -> bool {
    let ok = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success());
    debug!(program, available = ok, "probed container engine");
    ok
}
