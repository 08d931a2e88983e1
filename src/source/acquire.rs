use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::types::{AcquiredSource, CustomScripts};
use crate::error::{Error, Result};
use crate::staging::StagingArea;

/// URL prefixes cloned with git rather than copied from disk.
const REMOTE_PREFIXES: [&str; 5] = ["git://", "ssh://", "http://", "https://", "git@"];

/// Conventional location of custom scripts inside an application source tree.
pub const SCRIPTS_SUBDIR: &str = ".s2i/bin";

/// Whether `location` should be fetched over the network.
pub fn is_remote(location: &str) -> bool {
    REMOTE_PREFIXES.iter().any(|p| location.starts_with(p))
}

/// Materialize `location` into the staging area's source directory.
///
/// Remote locations are cloned; anything else is treated as a local path
/// (an optional `file://` prefix is stripped) whose contents are copied
/// without an extra level of nesting. A `.s2i/bin` directory in the result
/// is moved out of the source tree into the staging scripts directory.
/// A clone still running after `clone_timeout` is interrupted.
pub fn acquire(
    location: &str,
    staging: &StagingArea,
    clone_timeout: Duration,
) -> Result<AcquiredSource> {
    let source_dir = staging.source_dir();

    if is_remote(location) {
        info!(url = location, "cloning source");
        clone_repo(location, &source_dir, clone_timeout)?;
    } else {
        let path = Path::new(location.strip_prefix("file://").unwrap_or(location));
        if !path.is_dir() {
            return Err(fetch_error(
                location,
                format!("{} is not a directory", path.display()),
            ));
        }
        info!(path = %path.display(), "copying source");
        copy_tree(path, &source_dir).map_err(|e| fetch_error(location, e))?;
    }

    let scripts = relocate_scripts(&source_dir, &staging.scripts_dir())?;
    Ok(AcquiredSource {
        source_dir,
        scripts,
    })
}

fn fetch_error(location: &str, reason: impl std::fmt::Display) -> Error {
    Error::SourceFetch {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}

fn clone_repo(url: &str, dest: &Path, timeout: Duration) -> Result<()> {
    let watchdog = Watchdog::start(timeout);
    let result = fetch_and_checkout(url, dest, watchdog.flag());
    let fired = watchdog.finish();

    result.map_err(|reason| {
        if fired {
            fetch_error(url, format!("clone timed out after {}s", timeout.as_secs()))
        } else {
            fetch_error(url, reason)
        }
    })
}

fn fetch_and_checkout(
    url: &str,
    dest: &Path,
    interrupt: &AtomicBool,
) -> std::result::Result<(), String> {
    let mut prepared = gix::prepare_clone(url, dest).map_err(|e| e.to_string())?;

    let (mut checkout, _outcome) = prepared
        .fetch_then_checkout(gix::progress::Discard, interrupt)
        .map_err(|e| e.to_string())?;

    let (_repo, _outcome) = checkout
        .main_worktree(gix::progress::Discard, interrupt)
        .map_err(|e| e.to_string())?;

    Ok(())
}

/// Raises an interrupt flag once `timeout` passes unless finished first.
struct Watchdog {
    flag: Arc<AtomicBool>,
    done: Sender<()>,
    handle: JoinHandle<()>,
}

impl Watchdog {
    fn start(timeout: Duration) -> Self {
        let flag = Arc::new(AtomicBool::new(false));
        let (done, rx) = mpsc::channel::<()>();
        let raised = flag.clone();
        let handle = std::thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
                raised.store(true, Ordering::SeqCst);
            }
        });
        Self { flag, done, handle }
    }

    fn flag(&self) -> &AtomicBool {
        &self.flag
    }

    /// Stop watching. Returns whether the flag was raised.
    fn finish(self) -> bool {
        drop(self.done);
        let _ = self.handle.join();
        self.flag.load(Ordering::SeqCst)
    }
}

/// Recursively copy the contents of `from` into `to`. Symlinks are copied
/// as links, not followed.
fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in WalkDir::new(from).min_depth(1).follow_links(false) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let target = to.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else {
            warn!(path = %entry.path().display(), "skipping special file in source tree");
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(link)?, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> io::Result<()> {
    fs::copy(link, target).map(|_| ())
}

fn relocate_scripts(source_dir: &Path, scripts_dir: &Path) -> Result<Option<CustomScripts>> {
    let candidate = source_dir.join(SCRIPTS_SUBDIR);
    if !candidate.is_dir() {
        return Ok(None);
    }

    fs::rename(&candidate, scripts_dir)
        .map_err(|e| Error::io("failed to relocate custom scripts", &candidate, e))?;
    debug!(dir = %scripts_dir.display(), "relocated custom scripts");

    Ok(Some(CustomScripts {
        dir: scripts_dir.to_path_buf(),
        assemble: is_executable(&scripts_dir.join("assemble")),
        run: is_executable(&scripts_dir.join("run")),
    }))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
