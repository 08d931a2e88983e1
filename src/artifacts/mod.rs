//! Carry build artifacts forward from the previously built image.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::engine::{ContainerEngine, TransientRun};
use crate::error::{Error, Result};
use crate::staging::{ARTIFACTS_ARCHIVE, StagingArea};

/// Mount point of the extraction directory inside the export container.
const CONTAINER_EXTRACT_DIR: &str = "/tmp/s2ib-artifacts";

/// A tar archive with no entries: two zero-filled 512-byte blocks.
const EMPTY_TAR: [u8; 1024] = [0; 1024];

/// Export artifacts from `tag` into the staging area's artifacts archive.
///
/// `tag` must already exist locally; its absence is how a first build is
/// told apart from an incremental one, so it fails the build. When the image
/// has no (or an empty) `save-artifacts` script the archive is an empty
/// placeholder.
pub fn extract_artifacts(
    engine: &dyn ContainerEngine,
    tag: &str,
    uid: u32,
    staging: &StagingArea,
    scripts_dir: &str,
) -> Result<PathBuf> {
    if !engine.image_exists(tag)? {
        return Err(Error::MissingPriorImage {
            tag: tag.to_string(),
        });
    }

    let extract_dir = staging.extract_dir();
    create_private_dir(&extract_dir)?;
    grant_access(&extract_dir, uid)?;

    let run = TransientRun {
        image: tag.to_string(),
        command: vec!["sh".into(), "-c".into(), export_script(scripts_dir)],
        user: Some(uid.to_string()),
        mounts: vec![format!(
            "{}:{}",
            extract_dir.display(),
            CONTAINER_EXTRACT_DIR
        )],
    };
    let result = engine.run_transient(&run)?;
    if !result.success {
        return Err(Error::ArtifactExtraction {
            tag: tag.to_string(),
            reason: result.log.trim().to_string(),
        });
    }

    let produced = extract_dir.join(ARTIFACTS_ARCHIVE);
    if !produced.exists() {
        info!(tag, "no artifacts exported; using an empty archive");
        fs::write(&produced, EMPTY_TAR)
            .map_err(|e| Error::io("failed to write placeholder archive", &produced, e))?;
    }

    let archive = staging.artifacts_archive();
    fs::rename(&produced, &archive)
        .map_err(|e| Error::io("failed to move artifacts archive", &produced, e))?;
    if let Err(e) = fs::remove_dir(&extract_dir) {
        warn!(dir = %extract_dir.display(), error = %e, "failed to remove extraction directory");
    }

    info!(tag, archive = %archive.display(), "extracted artifacts");
    Ok(archive)
}

/// Shell run inside the previous image: stream `save-artifacts` output into
/// the mounted directory only when the script exists and is non-empty.
fn export_script(scripts_dir: &str) -> String {
    let save = format!("{}/save-artifacts", scripts_dir.trim_end_matches('/'));
    let out = format!("{CONTAINER_EXTRACT_DIR}/{ARTIFACTS_ARCHIVE}");
    let save = shell_words::quote(&save);
    let out = shell_words::quote(&out);
    format!("if [ -s {save} ]; then {save} > {out}; fi")
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .mode(0o700)
        .create(dir)
        .map_err(|e| Error::io("failed to create extraction directory", dir, e))
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> Result<()> {
    fs::create_dir(dir).map_err(|e| Error::io("failed to create extraction directory", dir, e))
}

/// Let `uid` write into `dir` from inside the container. Root hands the
/// directory over; anyone else opens it up, relying on the 0700 staging
/// directory above it to keep other host users out.
#[cfg(unix)]
fn grant_access(dir: &Path, uid: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    // SAFETY: geteuid() is a simple POSIX getter that always succeeds and has no side effects.
    let euid = unsafe { libc::geteuid() };
    if euid == uid {
        return Ok(());
    }
    if euid == 0 {
        return std::os::unix::fs::chown(dir, Some(uid), None)
            .map_err(|e| Error::io("failed to hand extraction directory to build user", dir, e));
    }
    fs::set_permissions(dir, fs::Permissions::from_mode(0o777))
        .map_err(|e| Error::io("failed to open extraction directory to build user", dir, e))
}

#[cfg(not(unix))]
fn grant_access(_dir: &Path, _uid: u32) -> Result<()> {
    Ok(())
}
