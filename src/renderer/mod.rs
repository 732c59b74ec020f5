//! Variant resolution and per-draw binding
//!
//! - [`resolver`]: decides whether a drawable's variant must change
//! - [`cache_slot`]: per-drawable committed variant and staleness state
//! - [`program`]: program requests and the host program cache
//! - [`binding`]: uniform sink and per-frame context
//! - [`lighting`]: host light preparation
//! - [`drawable`]: mesh and scene snapshots
//! - [`fallbacks`]: ranked compile fallbacks

pub mod binding;
pub mod cache_slot;
pub mod drawable;
pub mod fallbacks;
pub mod lighting;
pub mod program;
pub mod resolver;

pub use binding::{BoundValue, FrameContext, RecordingSink, UniformSink};
pub use cache_slot::{CacheSlot, CommittedVariant, DirtyCategories};
pub use drawable::{DrawableState, FogMode, FogSettings, MeshAttributes, SceneFlags};
pub use fallbacks::Fallbacks;
pub use lighting::{LightInfo, LightKind, LightingDefines, LightingPreparer, NoLights, SceneLights, ShadowMap};
pub use program::{
    CompileStatus, LAYER_SHADER_NAME, ProgramCache, ProgramHandle, ProgramRegistry, ProgramRequest,
};
pub use resolver::{ResolutionOutcome, ResolveOptions, derive_flags, resolve};
