use std::path::PathBuf;

/// Application source materialized in the staging area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquiredSource {
    pub source_dir: PathBuf,
    pub scripts: Option<CustomScripts>,
}

/// Scripts shipped with the application in `.s2i/bin`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomScripts {
    pub dir: PathBuf,
    /// `assemble` exists and is executable.
    pub assemble: bool,
    /// `run` exists and is executable.
    pub run: bool,
}
