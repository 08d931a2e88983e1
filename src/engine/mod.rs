// Container engine access: the capability trait the pipeline is written
// against, the CLI-backed implementation, and process plumbing.

pub mod cli;
pub mod run;
pub mod runtime;
pub mod types;

use std::time::Duration;

use thiserror::Error;

pub use cli::CliEngine;
pub use runtime::{SUPPORTED_ENGINES, resolve_runtime};
pub use types::{BuildInvocation, CommandResult, EngineCommand, OutputLine, TransientRun};

/// Failures of the engine process itself, as opposed to a command that ran
/// and reported an unsuccessful result.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to invoke `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` exited with {exit_code:?}:\n{log}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        log: String,
    },
}

/// Everything the build pipeline needs from a container engine.
///
/// The production implementation shells out to `docker` or `podman`; tests
/// substitute a scripted fake.
pub trait ContainerEngine {
    /// Whether `image` is present in local image storage.
    fn image_exists(&self, image: &str) -> Result<bool, EngineError>;

    fn pull(&self, image: &str) -> Result<(), EngineError>;

    /// The raw `Config.User` string of `image`, possibly empty.
    fn inspect_user(&self, image: &str) -> Result<String, EngineError>;

    /// Run a removed-on-exit container. A nonzero exit is reported in the
    /// result, not as an error.
    fn run_transient(&self, run: &TransientRun) -> Result<CommandResult, EngineError>;

    /// Build and tag an image with layer cache reuse disabled. A failed build
    /// is reported in the result, not as an error.
    fn build(&self, build: &BuildInvocation) -> Result<CommandResult, EngineError>;
}
