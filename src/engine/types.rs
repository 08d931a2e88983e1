use std::path::PathBuf;
use std::time::Duration;

/// Describes one engine invocation. `args` is the full argument list passed
/// to the engine binary (callers are responsible for assembling it).
#[derive(Debug, Clone)]
pub struct EngineCommand {
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl EngineCommand {
    /// Render as a shell-quoted command line for logs and error messages.
    pub fn display(&self, program: &str) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(program);
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }
}

/// Outcome of an engine process that ran to completion or was killed.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Standard output only, in arrival order.
    pub stdout: String,
    /// Both streams interleaved, the way a user would have seen them.
    pub log: String,
    pub timed_out: bool,
}

/// Streamed output from a running engine process.
#[derive(Debug)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
    Done(CommandResult),
}

/// A throwaway container: started, waited on, and removed on exit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientRun {
    pub image: String,
    pub command: Vec<String>,
    /// Overrides the image's configured user when set.
    pub user: Option<String>,
    /// Volume specs in the engine's `host:container[:opts]` form.
    pub mounts: Vec<String>,
}

/// Arguments for the final image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInvocation {
    pub context_dir: PathBuf,
    pub definition_file: PathBuf,
    pub tag: String,
    /// Passed through verbatim as a `-v` option.
    pub mount: Option<String>,
}
