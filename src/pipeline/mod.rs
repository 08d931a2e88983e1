pub mod driver;
pub mod orchestrator;
mod types;

pub use orchestrator::{ensure_base_image, run_build, run_usage};
pub use types::{BuildOptions, BuildOutcome, BuildRequest};
