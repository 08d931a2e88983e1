//! Resolve the numeric user ID a builder image runs as.

use std::fmt;

use tracing::{debug, info};

use crate::engine::{ContainerEngine, TransientRun};
use crate::error::{Error, Result};

/// The image's runtime user, always reduced to a uid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedUser {
    /// The image configures a numeric user (or none, meaning root).
    NumericUser(u32),
    /// The image configures a user name, looked up inside a container.
    NamedUserResolved(u32),
}

impl ResolvedUser {
    pub fn uid(self) -> u32 {
        match self {
            ResolvedUser::NumericUser(uid) | ResolvedUser::NamedUserResolved(uid) => uid,
        }
    }
}

impl fmt::Display for ResolvedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uid())
    }
}

/// Determine the uid `image` runs as.
///
/// A numeric (or empty) `Config.User` is answered from image metadata alone.
/// A user name requires starting a transient container to run `id -u`.
pub fn resolve_user(engine: &dyn ContainerEngine, image: &str) -> Result<ResolvedUser> {
    let configured = engine.inspect_user(image)?;
    let user = user_part(&configured);
    debug!(image, user, "inspected image user");

    if let Ok(uid) = user.parse::<u32>() {
        return Ok(ResolvedUser::NumericUser(uid));
    }

    let run = TransientRun {
        image: image.to_string(),
        command: vec!["id".into(), "-u".into(), user.to_string()],
        ..TransientRun::default()
    };
    let result = engine.run_transient(&run)?;

    let failure = |reason: String| Error::UserResolution {
        image: image.to_string(),
        user: user.to_string(),
        reason,
    };

    if !result.success {
        return Err(failure(result.log.trim().to_string()));
    }
    let uid = result
        .stdout
        .trim()
        .parse::<u32>()
        .map_err(|_| failure(format!("unexpected `id -u` output {:?}", result.stdout.trim())))?;

    info!(image, user, uid, "resolved named user");
    Ok(ResolvedUser::NamedUserResolved(uid))
}

/// The user half of a `user[:group]` spec; empty means root.
fn user_part(configured: &str) -> &str {
    let user = configured.trim().split(':').next().unwrap_or_default();
    if user.is_empty() { "0" } else { user }
}
