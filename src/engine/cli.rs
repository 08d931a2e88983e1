use std::time::Duration;

use tracing::{debug, info};

use super::run;
use super::types::{BuildInvocation, CommandResult, EngineCommand, TransientRun};
use super::{ContainerEngine, EngineError};

/// A [`ContainerEngine`] backed by the `docker`/`podman` command line.
#[derive(Debug, Clone)]
pub struct CliEngine {
    program: String,
    timeout: Duration,
    build_timeout: Duration,
}

impl CliEngine {
    pub fn new(program: impl Into<String>, timeout: Duration, build_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            build_timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, args: Vec<String>) -> EngineCommand {
        EngineCommand {
            args,
            timeout: self.timeout,
        }
    }

    fn execute(
        &self,
        cmd: EngineCommand,
        on_line: impl FnMut(&str),
    ) -> Result<CommandResult, EngineError> {
        let display = cmd.display(&self.program);
        let timeout = cmd.timeout;
        let result = run::run(&self.program, cmd, on_line)?;
        if result.timed_out {
            return Err(EngineError::TimedOut {
                command: display,
                timeout,
            });
        }
        Ok(result)
    }

    /// Like [`execute`](Self::execute) but treats a nonzero exit as an error.
    fn execute_checked(&self, cmd: EngineCommand) -> Result<CommandResult, EngineError> {
        let display = cmd.display(&self.program);
        let result = self.execute(cmd, |line| debug!(line, "engine output"))?;
        if !result.success {
            return Err(EngineError::Failed {
                command: display,
                exit_code: result.exit_code,
                log: result.log,
            });
        }
        Ok(result)
    }
}

impl ContainerEngine for CliEngine {
    fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        let result = self.execute_checked(self.command(images_args(image)))?;
        Ok(!result.stdout.trim().is_empty())
    }

    fn pull(&self, image: &str) -> Result<(), EngineError> {
        info!(image, "pulling image");
        self.execute_checked(self.command(pull_args(image)))?;
        Ok(())
    }

    fn inspect_user(&self, image: &str) -> Result<String, EngineError> {
        let result = self.execute_checked(self.command(inspect_user_args(image)))?;
        Ok(result.stdout.trim().to_string())
    }

    fn run_transient(&self, run: &TransientRun) -> Result<CommandResult, EngineError> {
        self.execute(self.command(run_args(run)), |line| {
            debug!(line, "container output")
        })
    }

    fn build(&self, build: &BuildInvocation) -> Result<CommandResult, EngineError> {
        let cmd = EngineCommand {
            args: build_args(build),
            timeout: self.build_timeout,
        };
        self.execute(cmd, |line| info!("{line}"))
    }
}

/// `images -q <ref>` prints one image ID per match and nothing otherwise.
pub fn images_args(image: &str) -> Vec<String> {
    vec!["images".into(), "-q".into(), image.into()]
}

pub fn pull_args(image: &str) -> Vec<String> {
    vec!["pull".into(), image.into()]
}

pub fn inspect_user_args(image: &str) -> Vec<String> {
    vec![
        "inspect".into(),
        "--type".into(),
        "image".into(),
        "--format".into(),
        "{{.Config.User}}".into(),
        image.into(),
    ]
}

/// `run --rm` with the entrypoint cleared so `command` runs as given.
pub fn run_args(run: &TransientRun) -> Vec<String> {
    let mut args: Vec<String> = vec!["run".into(), "--rm".into()];
    if let Some(user) = &run.user {
        args.extend(["--user".into(), user.clone()]);
    }
    for mount in &run.mounts {
        args.extend(["-v".into(), mount.clone()]);
    }
    args.extend(["--entrypoint".into(), String::new(), run.image.clone()]);
    args.extend(run.command.iter().cloned());
    args
}

pub fn build_args(build: &BuildInvocation) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "build".into(),
        "-f".into(),
        build.definition_file.display().to_string(),
        "--no-cache".into(),
    ];
    if let Some(mount) = &build.mount {
        args.extend(["-v".into(), mount.clone()]);
    }
    args.extend([
        "-t".into(),
        build.tag.clone(),
        build.context_dir.display().to_string(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn inspect_user_args_use_config_user_template() {
        let args = inspect_user_args("builder:latest");
        assert_eq!(args.first().map(String::as_str), Some("inspect"));
        assert!(args.contains(&"{{.Config.User}}".into()));
        assert_eq!(args.last().map(String::as_str), Some("builder:latest"));
    }

    #[test]
    fn run_args_put_options_before_image() {
        let run = TransientRun {
            image: "app:out".into(),
            command: vec!["id".into(), "-u".into(), "default".into()],
            user: Some("1001".into()),
            mounts: vec!["/tmp/x:/out".into()],
        };
        let args = run_args(&run);
        assert_eq!(
            args,
            vec![
                "run", "--rm", "--user", "1001", "-v", "/tmp/x:/out", "--entrypoint", "",
                "app:out", "id", "-u", "default",
            ]
        );
    }

    #[test]
    fn run_args_without_user_or_mounts() {
        let run = TransientRun {
            image: "builder".into(),
            command: vec!["true".into()],
            ..TransientRun::default()
        };
        let args = run_args(&run);
        assert!(!args.contains(&"--user".into()));
        assert!(!args.contains(&"-v".into()));
        assert_eq!(args[args.len() - 2], "builder");
    }

    #[test]
    fn build_args_disable_cache_and_tag() {
        let build = BuildInvocation {
            context_dir: PathBuf::from("/tmp/s2ib-x"),
            definition_file: PathBuf::from("/tmp/s2ib-x/Dockerfile"),
            tag: "app:out".into(),
            mount: None,
        };
        let args = build_args(&build);
        assert_eq!(
            args,
            vec![
                "build",
                "-f",
                "/tmp/s2ib-x/Dockerfile",
                "--no-cache",
                "-t",
                "app:out",
                "/tmp/s2ib-x",
            ]
        );
    }

    #[test]
    fn build_args_pass_mount_through() {
        let build = BuildInvocation {
            context_dir: PathBuf::from("/ctx"),
            definition_file: PathBuf::from("/ctx/Dockerfile"),
            tag: "app:out".into(),
            mount: Some("/cache:/root/.m2:z".into()),
        };
        let args = build_args(&build);
        let pos = args.iter().position(|a| a == "-v").unwrap();
        assert_eq!(args[pos + 1], "/cache:/root/.m2:z");
        assert_eq!(args.last().map(String::as_str), Some("/ctx"));
    }

    #[cfg(unix)]
    #[test]
    fn missing_engine_binary_surfaces_spawn_error() {
        let engine = CliEngine::new(
            "s2ib-no-such-engine",
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let err = engine.image_exists("builder").unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
