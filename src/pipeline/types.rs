use std::path::PathBuf;

use crate::config::PullPolicy;
use crate::definition::{BuildDefinition, EnvVar};

/// Caller-supplied options for one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// `-e NAME=VALUE` assignments in the order given.
    pub env: Vec<EnvVar>,
    pub pull_policy: PullPolicy,
    pub incremental: bool,
    /// Volume spec passed through verbatim to the engine's build.
    pub mount: Option<String>,
}

/// Everything one build invocation needs from its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// A git/ssh/http(s) URL, or a local directory (optionally `file://`).
    pub source_location: String,
    pub base_image: String,
    pub destination_tag: String,
    pub options: BuildOptions,
}

/// What a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub tag: String,
    pub definition: BuildDefinition,
    /// Set when the retention policy kept the staging directory.
    pub staging_dir: Option<PathBuf>,
}
