use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

/// Every failure that aborts a build invocation.
///
/// None of these is retried: the pipeline stops at the first one and the
/// destination tag is left untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no usable container engine: {0}")]
    RuntimeUnavailable(String),

    #[error("failed to fetch source from '{location}': {reason}")]
    SourceFetch { location: String, reason: String },

    #[error("failed to resolve user '{user}' in image '{image}': {reason}")]
    UserResolution {
        image: String,
        user: String,
        reason: String,
    },

    #[error("incremental build requested but image '{tag}' does not exist locally")]
    MissingPriorImage { tag: String },

    #[error("base image '{image}' is not available: {reason}")]
    BaseImageUnavailable { image: String, reason: String },

    #[error("failed to extract artifacts from '{tag}': {reason}")]
    ArtifactExtraction { tag: String, reason: String },

    #[error("build of '{tag}' failed:\n{output}")]
    Build { tag: String, output: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{context} ({}): {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            context,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
