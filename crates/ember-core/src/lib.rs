//! Ember Core - Foundational types for the Ember particle renderer
//!
//! This crate provides the types the other Ember crates depend on:
//! - `Vec3` - Spatial math for the camera and viewer
//! - Error types and Result alias

mod error;
mod types;

pub use error::{EmberError, Result};
pub use types::Vec3;
