use std::collections::BTreeMap;

use super::types::{BuildDefinition, BuildInstruction, EnvVar};
use crate::pipeline::BuildRequest;
use crate::source::CustomScripts;
use crate::staging::{ARTIFACTS_ARCHIVE, SCRIPTS_DIR, SOURCE_DIR};
use crate::user::ResolvedUser;

pub const LABEL_BUILD_IMAGE: &str = "io.openshift.s2i.build.image";
pub const LABEL_SOURCE_LOCATION: &str = "io.openshift.s2i.build.source-location";

const IMAGE_SOURCE_DIR: &str = "/tmp/src";
const IMAGE_SCRIPTS_DIR: &str = "/tmp/scripts";
const IMAGE_ARTIFACTS_DIR: &str = "/tmp/artifacts";

/// Inputs gathered by the earlier pipeline steps.
#[derive(Debug, Clone)]
pub struct SynthesisInput<'a> {
    pub request: &'a BuildRequest,
    /// Custom scripts relocated out of the source tree, if any.
    pub scripts: Option<&'a CustomScripts>,
    /// Assignments from the source's `.s2i/environment`, in file order.
    pub environment: &'a [EnvVar],
    pub user: ResolvedUser,
    /// An artifacts archive was extracted into the staging area.
    pub artifacts_present: bool,
    /// Where the builder image keeps its own `assemble`/`run`.
    pub default_scripts_dir: &'a str,
}

/// Produce the build definition. Pure: the same input always yields the
/// same instruction sequence.
pub fn synthesize(input: &SynthesisInput<'_>) -> BuildDefinition {
    let request = input.request;
    let uid = input.user.uid();
    let owner = |dir: &str| BuildInstruction::Run(format!("chown -R {uid}:0 {dir}"));

    let mut labels = BTreeMap::new();
    labels.insert(LABEL_BUILD_IMAGE.to_string(), request.base_image.clone());
    labels.insert(
        LABEL_SOURCE_LOCATION.to_string(),
        request.source_location.clone(),
    );

    let mut out = vec![
        BuildInstruction::From(request.base_image.clone()),
        BuildInstruction::Label(labels),
        BuildInstruction::SetUser(0),
        BuildInstruction::Copy {
            src: SOURCE_DIR.to_string(),
            dst: IMAGE_SOURCE_DIR.to_string(),
        },
    ];

    if input.scripts.is_some() {
        out.push(BuildInstruction::Copy {
            src: SCRIPTS_DIR.to_string(),
            dst: IMAGE_SCRIPTS_DIR.to_string(),
        });
        out.push(owner(IMAGE_SCRIPTS_DIR));
    }
    out.push(owner(IMAGE_SOURCE_DIR));

    // Request-supplied values come last so they win at build time.
    out.extend(
        input
            .environment
            .iter()
            .chain(&request.options.env)
            .map(|var| BuildInstruction::Env {
                name: var.name.clone(),
                value: var.value.clone(),
            }),
    );

    if request.options.incremental && input.artifacts_present {
        out.push(BuildInstruction::Run(format!("mkdir {IMAGE_ARTIFACTS_DIR}")));
        out.push(BuildInstruction::AddArchive {
            src: ARTIFACTS_ARCHIVE.to_string(),
            dst: IMAGE_ARTIFACTS_DIR.to_string(),
        });
        out.push(owner(IMAGE_ARTIFACTS_DIR));
    }

    out.push(BuildInstruction::SetUser(uid));

    let custom = input.scripts;
    out.push(BuildInstruction::Run(script_path(
        "assemble",
        custom.is_some_and(|s| s.assemble),
        input.default_scripts_dir,
    )));
    out.push(BuildInstruction::Cmd(script_path(
        "run",
        custom.is_some_and(|s| s.run),
        input.default_scripts_dir,
    )));

    BuildDefinition::new(out)
}

fn script_path(name: &str, custom: bool, default_dir: &str) -> String {
    if custom {
        format!("{IMAGE_SCRIPTS_DIR}/{name}")
    } else {
        format!("{}/{name}", default_dir.trim_end_matches('/'))
    }
}
