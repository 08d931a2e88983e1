//! Scripted stand-in for a container engine.
//!
//! Images, configured users and `id -u` answers are set up front; every call
//! is recorded so tests can assert on what the pipeline asked for.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use s2ib::config::Config;
use s2ib::engine::{BuildInvocation, CommandResult, ContainerEngine, EngineError, TransientRun};

#[derive(Debug, Clone)]
pub enum Call {
    ImageExists(String),
    Pull(String),
    InspectUser(String),
    Run(TransientRun),
    Build(RecordedBuild),
}

/// What the build step saw, captured before the staging area goes away.
#[derive(Debug, Clone)]
pub struct RecordedBuild {
    pub invocation: BuildInvocation,
    pub definition: String,
    pub artifacts_size: Option<u64>,
}

#[derive(Default)]
pub struct FakeEngine {
    images: RefCell<HashSet<String>>,
    users: HashMap<String, String>,
    known_ids: HashMap<String, u32>,
    /// Bytes `save-artifacts` writes; `None` means the script is absent.
    saved_artifacts: Option<Vec<u8>>,
    /// Output of a `save-artifacts` run that exits nonzero.
    save_failure: Option<String>,
    build_failure: Option<String>,
    pull_failure: Option<String>,
    calls: RefCell<Vec<Call>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an image present in local storage.
    pub fn with_image(mut self, image: &str, user: &str) -> Self {
        self.images.get_mut().insert(image.to_string());
        self.users.insert(image.to_string(), user.to_string());
        self
    }

    /// Register a pullable-but-absent image.
    pub fn with_remote_image(mut self, image: &str, user: &str) -> Self {
        self.users.insert(image.to_string(), user.to_string());
        self
    }

    pub fn with_known_user(mut self, name: &str, uid: u32) -> Self {
        self.known_ids.insert(name.to_string(), uid);
        self
    }

    pub fn with_saved_artifacts(mut self, bytes: &[u8]) -> Self {
        self.saved_artifacts = Some(bytes.to_vec());
        self
    }

    pub fn failing_save_artifacts(mut self, log: &str) -> Self {
        self.save_failure = Some(log.to_string());
        self
    }

    pub fn failing_build(mut self, output: &str) -> Self {
        self.build_failure = Some(output.to_string());
        self
    }

    pub fn failing_pull(mut self, output: &str) -> Self {
        self.pull_failure = Some(output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn runs(&self) -> Vec<TransientRun> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Run(run) => Some(run),
                _ => None,
            })
            .collect()
    }

    pub fn builds(&self) -> Vec<RecordedBuild> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Build(build) => Some(build),
                _ => None,
            })
            .collect()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Pull(image) => Some(image),
                _ => None,
            })
            .collect()
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.images.borrow().contains(image)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn finished(success: bool, stdout: &str, log: &str) -> CommandResult {
    CommandResult {
        success,
        exit_code: Some(if success { 0 } else { 1 }),
        stdout: stdout.to_string(),
        log: log.to_string(),
        timed_out: false,
    }
}

impl ContainerEngine for FakeEngine {
    fn image_exists(&self, image: &str) -> Result<bool, EngineError> {
        self.record(Call::ImageExists(image.to_string()));
        Ok(self.has_image(image))
    }

    fn pull(&self, image: &str) -> Result<(), EngineError> {
        self.record(Call::Pull(image.to_string()));
        if let Some(log) = &self.pull_failure {
            return Err(EngineError::Failed {
                command: format!("pull {image}"),
                exit_code: Some(1),
                log: log.clone(),
            });
        }
        if !self.users.contains_key(image) {
            return Err(EngineError::Failed {
                command: format!("pull {image}"),
                exit_code: Some(1),
                log: "manifest unknown".into(),
            });
        }
        self.images.borrow_mut().insert(image.to_string());
        Ok(())
    }

    fn inspect_user(&self, image: &str) -> Result<String, EngineError> {
        self.record(Call::InspectUser(image.to_string()));
        self.users
            .get(image)
            .cloned()
            .ok_or_else(|| EngineError::Failed {
                command: format!("inspect {image}"),
                exit_code: Some(1),
                log: "no such image".into(),
            })
    }

    fn run_transient(&self, run: &TransientRun) -> Result<CommandResult, EngineError> {
        self.record(Call::Run(run.clone()));

        if run.command.first().map(String::as_str) == Some("id") {
            let name = run.command.last().cloned().unwrap_or_default();
            return Ok(match self.known_ids.get(&name) {
                Some(uid) => finished(true, &format!("{uid}\n"), &format!("{uid}\n")),
                None => finished(false, "", &format!("id: '{name}': no such user\n")),
            });
        }

        if run.command.first().map(String::as_str) == Some("sh") {
            if let Some(log) = &self.save_failure {
                return Ok(finished(false, "", log));
            }
            if let Some(bytes) = &self.saved_artifacts {
                let host = mount_host_dir(run).expect("export run must mount a directory");
                std::fs::write(host.join("artifacts.tar"), bytes).unwrap();
            }
        }

        Ok(finished(true, "", ""))
    }

    fn build(&self, build: &BuildInvocation) -> Result<CommandResult, EngineError> {
        let definition = std::fs::read_to_string(&build.definition_file).unwrap_or_default();
        let artifacts_size = std::fs::metadata(build.context_dir.join("artifacts.tar"))
            .ok()
            .map(|m| m.len());
        self.record(Call::Build(RecordedBuild {
            invocation: build.clone(),
            definition,
            artifacts_size,
        }));

        if let Some(output) = &self.build_failure {
            return Ok(finished(false, "", output));
        }
        self.images.borrow_mut().insert(build.tag.clone());
        Ok(finished(true, "", "Successfully built\n"))
    }
}

fn mount_host_dir(run: &TransientRun) -> Option<PathBuf> {
    run.mounts
        .first()
        .and_then(|m| m.split_once(':'))
        .map(|(host, _)| PathBuf::from(host))
}

/// Config whose staging directories land under `root`.
pub fn config_in(root: &Path) -> Config {
    Config {
        staging_root: Some(root.to_path_buf()),
        ..Config::default()
    }
}

/// A local application source directory with one file.
pub fn app_source() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.py"), "print('hello')\n").unwrap();
    dir
}
