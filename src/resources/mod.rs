//! Core resource definitions
//!
//! Host-independent building blocks used by the material:
//! - ShaderDefines: interned, sorted define sets
//! - TextureRef: shared handle to a host texture
//! - ChangeTracker: version counter for settings changes

pub mod shader_defines;
pub mod texture;
pub mod version_tracker;

pub use shader_defines::ShaderDefines;
pub use texture::{TextureRef, TextureResource};
pub use version_tracker::{ChangeTracker, MutGuard};
