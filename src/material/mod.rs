//! Layer material
//!
//! - [`layer`]: the material, its settings and the readiness/binding entry points
//! - [`defines`]: feature flags and canonical variant keys
//! - [`descriptor`]: serde codec

mod macros;

pub mod defines;
pub mod descriptor;
pub mod layer;

pub use defines::{FeatureFlags, VariantKey};
pub use descriptor::LayerMaterialDescriptor;
pub use layer::{LayerMaterial, LayerMaterialSettings};
