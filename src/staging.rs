//! Per-build working directory.
//!
//! Layout, relative to the staging root (which doubles as the build context):
//!
//! ```text
//! src/            acquired application source
//! scripts/        custom scripts relocated out of `src/.s2i/bin`
//! Dockerfile      serialized build definition
//! artifacts.tar   archive carried forward from the previous image
//! ```

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::config::KeepStaging;
use crate::error::{Error, Result};

pub const SOURCE_DIR: &str = "src";
pub const SCRIPTS_DIR: &str = "scripts";
pub const DEFINITION_FILE: &str = "Dockerfile";
pub const ARTIFACTS_ARCHIVE: &str = "artifacts.tar";
/// Scratch directory mounted into the artifact-export container.
pub const EXTRACT_DIR: &str = "extract";

/// A uniquely named directory owned by exactly one build invocation.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a fresh `s2ib-*` directory (mode 0700) under `root`, or under
    /// the system temp dir when `root` is `None`.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("s2ib-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .map_err(|e| Error::io("failed to create staging root", root, e))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| {
            Error::io(
                "failed to create staging directory",
                root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
                e,
            )
        })?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.path().join(SOURCE_DIR)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.path().join(SCRIPTS_DIR)
    }

    pub fn definition_file(&self) -> PathBuf {
        self.path().join(DEFINITION_FILE)
    }

    pub fn artifacts_archive(&self) -> PathBuf {
        self.path().join(ARTIFACTS_ARCHIVE)
    }

    pub fn extract_dir(&self) -> PathBuf {
        self.path().join(EXTRACT_DIR)
    }

    /// Apply the retention policy. Returns the kept path, if any.
    pub fn finish(self, succeeded: bool, policy: KeepStaging) -> Option<PathBuf> {
        if policy.retains(succeeded) {
            let path = self.dir.keep();
            if succeeded {
                info!(path = %path.display(), "staging directory retained");
            } else {
                warn!(path = %path.display(), "build failed; staging directory retained");
            }
            return Some(path);
        }
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "failed to remove staging directory");
        }
        None
    }
}
