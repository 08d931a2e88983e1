//! Build container images from application source and a builder image.
//!
//! The builder image carries `assemble`/`run` scripts. A build copies the
//! application source (and optionally artifacts from the previous image)
//! into a generated build definition, runs `assemble` as the image's user,
//! and sets `run` as the container command.

pub mod artifacts;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod staging;
pub mod user;

pub use error::{Error, Result};
