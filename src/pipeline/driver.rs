use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::definition::{BuildDefinition, to_dockerfile};
use crate::engine::{BuildInvocation, ContainerEngine};
use crate::error::{Error, Result};
use crate::staging::StagingArea;

/// Write `definition` into the staging area and build it as `tag`, using
/// the staging directory as the build context.
///
/// The engine only tags on success, so a failed build leaves `tag` as it
/// was; the engine's output is carried in [`Error::Build`].
pub fn build(
    engine: &dyn ContainerEngine,
    staging: &StagingArea,
    definition: &BuildDefinition,
    tag: &str,
    mount: Option<&str>,
) -> Result<()> {
    let definition_file = staging.definition_file();
    write_atomically(staging.path(), &definition_file, &to_dockerfile(definition))?;

    let invocation = BuildInvocation {
        context_dir: staging.path().to_path_buf(),
        definition_file,
        tag: tag.to_string(),
        mount: mount.map(str::to_string),
    };

    info!(tag, "building image");
    let result = engine.build(&invocation)?;
    if !result.success {
        return Err(Error::Build {
            tag: tag.to_string(),
            output: result.log,
        });
    }

    info!(tag, "image built");
    Ok(())
}

/// Write through a temp file in `dir` and rename into place, so `path`
/// never holds a partial definition.
fn write_atomically(dir: &Path, path: &Path, contents: &str) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::io("failed to create build definition", dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| Error::io("failed to write build definition", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::io("failed to persist build definition", path, e.error))?;
    Ok(())
}
