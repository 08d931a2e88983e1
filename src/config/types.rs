use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When to pull the base image before building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PullPolicy {
    Always,
    Never,
    #[default]
    IfNotPresent,
}

impl PullPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullPolicy::Always => "always",
            PullPolicy::Never => "never",
            PullPolicy::IfNotPresent => "if-not-present",
        }
    }
}

impl fmt::Display for PullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(PullPolicy::Always),
            "never" => Ok(PullPolicy::Never),
            "if-not-present" => Ok(PullPolicy::IfNotPresent),
            other => Err(format!(
                "invalid pull policy '{other}' (expected always, never or if-not-present)"
            )),
        }
    }
}

/// What happens to a staging directory once its build finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepStaging {
    Always,
    #[default]
    OnFailure,
    Never,
}

impl KeepStaging {
    pub fn retains(self, succeeded: bool) -> bool {
        match self {
            KeepStaging::Always => true,
            KeepStaging::OnFailure => !succeeded,
            KeepStaging::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `docker` or `podman`; probed when unset.
    pub engine: Option<String>,
    /// Seconds allowed for each images/pull/inspect/run call.
    pub engine_timeout: u64,
    /// Seconds allowed for the final image build.
    pub build_timeout: u64,
    /// Seconds allowed for cloning a remote source.
    pub clone_timeout: u64,
    /// Where builder images keep their default `assemble`/`run` scripts.
    pub scripts_dir: String,
    pub pull_policy: PullPolicy,
    pub keep_staging: KeepStaging,
    /// Parent of per-build staging directories; the system temp dir if unset.
    pub staging_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: None,
            engine_timeout: 300,
            build_timeout: 3600,
            clone_timeout: 600,
            scripts_dir: "/usr/libexec/s2i".to_string(),
            pull_policy: PullPolicy::IfNotPresent,
            keep_staging: KeepStaging::OnFailure,
            staging_root: None,
        }
    }
}
