#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::float_cmp)]

pub mod errors;
pub mod material;
pub mod renderer;
pub mod resources;
pub mod settings;
pub mod utils;

pub use errors::{MaterialError, Result};
pub use material::{FeatureFlags, LayerMaterial, LayerMaterialDescriptor, LayerMaterialSettings, VariantKey};
pub use renderer::{
    CacheSlot, CompileStatus, DrawableState, FrameContext, LightingPreparer, ProgramCache,
    ProgramHandle, ProgramRegistry, ProgramRequest, ResolutionOutcome, ResolveOptions,
    UniformSink, resolve,
};
pub use resources::{ShaderDefines, TextureRef, TextureResource};
pub use settings::ResolverConfig;
pub use utils::interner;
