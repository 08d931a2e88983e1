mod acquire;
mod types;

pub use acquire::{SCRIPTS_SUBDIR, acquire, is_remote};
pub use types::{AcquiredSource, CustomScripts};
