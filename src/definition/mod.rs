// Build definitions: the typed instruction sequence, how it is synthesized
// from pipeline inputs, and how it is rendered for the engine.

pub mod env_file;
mod serialize;
mod synthesize;
mod types;

pub use serialize::to_dockerfile;
pub use synthesize::{LABEL_BUILD_IMAGE, LABEL_SOURCE_LOCATION, SynthesisInput, synthesize};
pub use types::{BuildDefinition, BuildInstruction, EnvVar};
