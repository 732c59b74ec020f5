//! Program requests and the host program cache
//!
//! The resolver never owns compiled programs. It describes what it needs as
//! a [`ProgramRequest`] and hands it to the host's [`ProgramCache`], which
//! answers with a [`ProgramHandle`] once the program is usable.
//!
//! [`ProgramRegistry`] is an in-memory [`ProgramCache`] with the same
//! storage layout the pipeline caches use: handles index a slot map, and a
//! key lookup deduplicates identical variants. Compilation can be made
//! deferred to model hosts that compile asynchronously.

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::material::defines::{FeatureFlags, VariantKey};
use crate::renderer::fallbacks::Fallbacks;

new_key_type! {
    /// Handle to a compiled program owned by the host.
    pub struct ProgramHandle;
}

/// Name of the layer material shader program.
pub const LAYER_SHADER_NAME: &str = "layerMaterial";

const BASE_UNIFORMS: [&str; 17] = [
    "world",
    "view",
    "viewProjection",
    "vEyePosition",
    "vLightsType",
    "vBackgroundColor",
    "vSpecularColor",
    "vFogInfos",
    "vFogColor",
    "pointSize",
    "vDiffuseInfos",
    "vBumpInfos",
    "bumpMatrix",
    "mBones",
    "vClipPlane",
    "diffuseMatrix",
    "vTangentSpaceParams",
];

const BASE_SAMPLERS: [&str; 2] = ["diffuseSampler", "bumpSampler"];

/// Host answer to a compile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileStatus {
    /// The program can be used right away.
    Ready(ProgramHandle),
    /// Compilation is in flight; ask again on a later pass.
    Pending(ProgramHandle),
    Failed(String),
}

/// Everything the host needs to compile one variant.
#[derive(Debug, Clone)]
pub struct ProgramRequest {
    pub shader_name: &'static str,
    pub key: VariantKey,
    /// `#define` block prepended to the shader source.
    pub defines: String,
    pub attributes: SmallVec<[&'static str; 12]>,
    pub uniforms: Vec<String>,
    pub samplers: Vec<String>,
    pub fallbacks: Fallbacks,
    /// Highest light index the light loop unrolls to.
    pub max_light_index: u32,
}

impl ProgramRequest {
    /// Builds the request for a layer material variant.
    #[must_use]
    pub fn for_variant(key: &VariantKey, flags: &FeatureFlags, max_simultaneous_lights: u32) -> Self {
        Self {
            shader_name: LAYER_SHADER_NAME,
            key: key.clone(),
            defines: flags.to_defines().define_block(),
            attributes: attributes_for(flags),
            uniforms: uniforms_for(max_simultaneous_lights),
            samplers: samplers_for(max_simultaneous_lights),
            fallbacks: fallbacks_for(flags),
            max_light_index: max_simultaneous_lights.saturating_sub(1),
        }
    }
}

fn attributes_for(flags: &FeatureFlags) -> SmallVec<[&'static str; 12]> {
    let mut attributes: SmallVec<[&'static str; 12]> = SmallVec::new();
    attributes.push("position");

    if flags.normal {
        attributes.push("normal");
    }
    if flags.uv1 {
        attributes.push("uv");
    }
    if flags.uv2 {
        attributes.push("uv2");
    }
    if flags.vertex_color {
        attributes.push("color");
    }
    if flags.num_bone_influencers > 0 {
        attributes.push("matricesIndices");
        attributes.push("matricesWeights");
        if flags.num_bone_influencers > 4 {
            attributes.push("matricesIndicesExtra");
            attributes.push("matricesWeightsExtra");
        }
    }
    if flags.instances {
        attributes.extend(["world0", "world1", "world2", "world3"]);
    }
    attributes
}

fn uniforms_for(max_lights: u32) -> Vec<String> {
    let mut uniforms: Vec<String> = BASE_UNIFORMS.iter().map(|u| (*u).to_string()).collect();
    for i in 0..max_lights {
        uniforms.extend([
            format!("vLightData{i}"),
            format!("vLightDiffuse{i}"),
            format!("vLightSpecular{i}"),
            format!("vLightDirection{i}"),
            format!("vLightGround{i}"),
            format!("lightMatrix{i}"),
            format!("shadowsInfo{i}"),
            format!("depthValues{i}"),
        ]);
    }
    uniforms
}

fn samplers_for(max_lights: u32) -> Vec<String> {
    let mut samplers: Vec<String> = BASE_SAMPLERS.iter().map(|s| (*s).to_string()).collect();
    samplers.extend((0..max_lights).map(|i| format!("shadowSampler{i}")));
    samplers
}

fn fallbacks_for(flags: &FeatureFlags) -> Fallbacks {
    let mut fallbacks = Fallbacks::new();
    if flags.fog {
        fallbacks.add_fallback(1, "FOG");
    }
    if flags.bump {
        fallbacks.add_fallback(0, "BUMP");
    }
    for i in 0..flags.light_count {
        if i > 0 {
            fallbacks.add_fallback(i, format!("LIGHT{i}"));
        }
        if flags.casts_shadow(i) {
            fallbacks.add_fallback(0, format!("SHADOW{i}"));
        }
    }
    if flags.num_bone_influencers > 0 {
        fallbacks.add_cpu_skinning_fallback(0);
    }
    fallbacks
}

/// Host program cache, reached through a narrow request/response interface.
pub trait ProgramCache {
    /// Looks up or starts compiling the program for `request`.
    fn compile(&mut self, request: &ProgramRequest) -> CompileStatus;

    /// `false` once the host has freed the program behind `handle`.
    fn is_valid(&self, handle: ProgramHandle) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramState {
    Compiling,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ProgramEntry {
    pub key: VariantKey,
    pub defines: String,
    pub state: ProgramState,
}

/// In-memory program cache.
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    programs: SlotMap<ProgramHandle, ProgramEntry>,
    lookup: FxHashMap<VariantKey, ProgramHandle>,
    deferred: bool,
    compile_requests: u64,
}

impl ProgramRegistry {
    /// Registry whose programs are ready as soon as they are requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose programs stay `Compiling` until [`Self::mark_ready`].
    #[must_use]
    pub fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn get(&self, handle: ProgramHandle) -> Option<&ProgramEntry> {
        self.programs.get(handle)
    }

    #[must_use]
    pub fn handle_for(&self, key: &VariantKey) -> Option<ProgramHandle> {
        self.lookup.get(key).copied()
    }

    pub fn mark_ready(&mut self, handle: ProgramHandle) -> bool {
        match self.programs.get_mut(handle) {
            Some(entry) => {
                entry.state = ProgramState::Ready;
                true
            }
            None => false,
        }
    }

    pub fn mark_failed(&mut self, handle: ProgramHandle, reason: impl Into<String>) -> bool {
        match self.programs.get_mut(handle) {
            Some(entry) => {
                entry.state = ProgramState::Failed(reason.into());
                true
            }
            None => false,
        }
    }

    /// Frees a program. Outstanding handles to it become invalid.
    pub fn remove(&mut self, handle: ProgramHandle) -> Option<ProgramEntry> {
        let entry = self.programs.remove(handle)?;
        self.lookup.remove(&entry.key);
        Some(entry)
    }

    /// Frees every program (device lost, shader hot reload...).
    pub fn clear(&mut self) {
        self.programs.clear();
        self.lookup.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Number of `compile` calls that created a new program.
    #[must_use]
    pub fn compile_requests(&self) -> u64 {
        self.compile_requests
    }

    fn status_of(handle: ProgramHandle, entry: &ProgramEntry) -> CompileStatus {
        match &entry.state {
            ProgramState::Compiling => CompileStatus::Pending(handle),
            ProgramState::Ready => CompileStatus::Ready(handle),
            ProgramState::Failed(reason) => CompileStatus::Failed(reason.clone()),
        }
    }
}

impl ProgramCache for ProgramRegistry {
    fn compile(&mut self, request: &ProgramRequest) -> CompileStatus {
        if let Some(&handle) = self.lookup.get(&request.key)
            && let Some(entry) = self.programs.get(handle)
        {
            return Self::status_of(handle, entry);
        }

        let state = if self.deferred {
            ProgramState::Compiling
        } else {
            ProgramState::Ready
        };
        let handle = self.programs.insert(ProgramEntry {
            key: request.key.clone(),
            defines: request.defines.clone(),
            state,
        });
        self.lookup.insert(request.key.clone(), handle);
        self.compile_requests += 1;

        log::debug!(
            "Program '{}' requested for variant {} ({} attributes, {} uniforms)",
            request.shader_name,
            request.key,
            request.attributes.len(),
            request.uniforms.len()
        );

        Self::status_of(handle, &self.programs[handle])
    }

    fn is_valid(&self, handle: ProgramHandle) -> bool {
        self.programs.contains_key(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(flags: &FeatureFlags) -> ProgramRequest {
        ProgramRequest::for_variant(&flags.variant_key(), flags, 4)
    }

    #[test]
    fn attributes_follow_flags() {
        let flags = FeatureFlags {
            normal: true,
            uv1: true,
            vertex_color: true,
            num_bone_influencers: 8,
            instances: true,
            ..FeatureFlags::default()
        };
        let req = request(&flags);

        assert_eq!(
            req.attributes.as_slice(),
            &[
                "position",
                "normal",
                "uv",
                "color",
                "matricesIndices",
                "matricesWeights",
                "matricesIndicesExtra",
                "matricesWeightsExtra",
                "world0",
                "world1",
                "world2",
                "world3",
            ]
        );
    }

    #[test]
    fn per_light_uniforms_and_samplers() {
        let req = request(&FeatureFlags::default());
        assert_eq!(req.uniforms.len(), BASE_UNIFORMS.len() + 4 * 8);
        assert!(req.uniforms.iter().any(|u| u == "vLightData3"));
        assert!(req.samplers.iter().any(|s| s == "shadowSampler3"));
        assert_eq!(req.max_light_index, 3);
    }

    #[test]
    fn fallbacks_rank_fog_above_bump() {
        let flags = FeatureFlags {
            fog: true,
            bump: true,
            light_count: 2,
            shadow_mask: 0b01,
            ..FeatureFlags::default()
        };
        let req = request(&flags);

        assert_eq!(req.fallbacks.defines_at(0), &["BUMP".to_string(), "SHADOW0".to_string()]);
        assert_eq!(req.fallbacks.defines_at(1), &["FOG".to_string(), "LIGHT1".to_string()]);
    }

    #[test]
    fn registry_deduplicates_by_key() {
        let mut registry = ProgramRegistry::new();
        let flags = FeatureFlags::default();

        let a = registry.compile(&request(&flags));
        let b = registry.compile(&request(&flags));
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.compile_requests(), 1);
    }

    #[test]
    fn deferred_registry_reports_pending_until_ready() {
        let mut registry = ProgramRegistry::deferred();
        let req = request(&FeatureFlags::default());

        let CompileStatus::Pending(handle) = registry.compile(&req) else {
            panic!("expected pending");
        };
        assert!(registry.mark_ready(handle));
        assert_eq!(registry.compile(&req), CompileStatus::Ready(handle));
    }

    #[test]
    fn failed_program_reports_its_reason() {
        let mut registry = ProgramRegistry::deferred();
        let req = request(&FeatureFlags::default());
        let CompileStatus::Pending(handle) = registry.compile(&req) else {
            panic!("expected pending");
        };

        assert!(registry.mark_failed(handle, "syntax error"));
        assert_eq!(registry.compile(&req), CompileStatus::Failed("syntax error".to_string()));
        assert_eq!(registry.compile_requests(), 1);

        registry.remove(handle);
        assert!(!registry.mark_failed(handle, "gone"));
    }

    #[test]
    fn removed_handle_is_invalid() {
        let mut registry = ProgramRegistry::new();
        let req = request(&FeatureFlags::default());
        let CompileStatus::Ready(handle) = registry.compile(&req) else {
            panic!("expected ready");
        };

        registry.remove(handle);
        assert!(!registry.is_valid(handle));
        assert!(registry.handle_for(&req.key).is_none());
    }
}
