use std::time::Duration;

use tracing::info;

use crate::artifacts;
use crate::config::{Config, PullPolicy};
use crate::definition::{BuildDefinition, SynthesisInput, env_file, synthesize};
use crate::engine::{ContainerEngine, EngineError, TransientRun};
use crate::error::{Error, Result};
use crate::source;
use crate::staging::StagingArea;
use crate::user;

use super::driver;
use super::types::{BuildOutcome, BuildRequest};

/// Run the whole build for `request`.
///
/// Steps run strictly in order (pull policy, acquire source, resolve user,
/// extract artifacts when incremental, synthesize, build) and the first
/// failure aborts the rest. The destination tag is only written by the final
/// build step. The staging directory is then kept or removed according to
/// `config.keep_staging`.
pub fn run_build(
    engine: &dyn ContainerEngine,
    config: &Config,
    request: &BuildRequest,
) -> Result<BuildOutcome> {
    let staging = StagingArea::create(config.staging_root.as_deref())?;
    info!(dir = %staging.path().display(), "staging build");

    let result = run_steps(engine, config, request, &staging);
    let staging_dir = staging.finish(result.is_ok(), config.keep_staging);

    result.map(|definition| BuildOutcome {
        tag: request.destination_tag.clone(),
        definition,
        staging_dir,
    })
}

fn run_steps(
    engine: &dyn ContainerEngine,
    config: &Config,
    request: &BuildRequest,
    staging: &StagingArea,
) -> Result<BuildDefinition> {
    let options = &request.options;

    ensure_base_image(engine, &request.base_image, options.pull_policy)?;

    let source = source::acquire(
        &request.source_location,
        staging,
        Duration::from_secs(config.clone_timeout),
    )?;
    let environment = env_file::load(&source.source_dir)?;

    let user = user::resolve_user(engine, &request.base_image)?;
    info!(image = %request.base_image, uid = user.uid(), "resolved image user");

    let artifacts_present = if options.incremental {
        artifacts::extract_artifacts(
            engine,
            &request.destination_tag,
            user.uid(),
            staging,
            &config.scripts_dir,
        )?;
        true
    } else {
        false
    };

    let definition = synthesize(&SynthesisInput {
        request,
        scripts: source.scripts.as_ref(),
        environment: &environment,
        user,
        artifacts_present,
        default_scripts_dir: &config.scripts_dir,
    });

    driver::build(
        engine,
        staging,
        &definition,
        &request.destination_tag,
        options.mount.as_deref(),
    )?;
    Ok(definition)
}

/// Make `image` available locally according to `policy`.
pub fn ensure_base_image(
    engine: &dyn ContainerEngine,
    image: &str,
    policy: PullPolicy,
) -> Result<()> {
    let unavailable = |reason: String| Error::BaseImageUnavailable {
        image: image.to_string(),
        reason,
    };

    let present = match policy {
        PullPolicy::Always => false,
        PullPolicy::Never | PullPolicy::IfNotPresent => engine.image_exists(image)?,
    };
    if present {
        return Ok(());
    }
    if policy == PullPolicy::Never {
        return Err(unavailable(
            "not present locally and pull policy is 'never'".to_string(),
        ));
    }
    engine.pull(image).map_err(|e| unavailable(e.to_string()))
}

/// Print-ready output of the builder image's `usage` script.
pub fn run_usage(engine: &dyn ContainerEngine, config: &Config, image: &str) -> Result<String> {
    let script = format!("{}/usage", config.scripts_dir.trim_end_matches('/'));
    let run = TransientRun {
        image: image.to_string(),
        command: vec![script.clone()],
        ..TransientRun::default()
    };
    let result = engine.run_transient(&run)?;
    if !result.success {
        return Err(EngineError::Failed {
            command: format!("{script} in {image}"),
            exit_code: result.exit_code,
            log: result.log,
        }
        .into());
    }
    Ok(result.stdout)
}
