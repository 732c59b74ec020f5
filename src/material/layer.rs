//! The layer material
//!
//! A two-layer surface: a background color, optionally covered by a diffuse
//! texture, with an optional normal (bump) map and standard lighting.
//!
//! [`LayerMaterial::is_ready_for_submesh`] runs the resolver for one
//! drawable, asks the host program cache for the resulting variant and
//! commits it once ready. [`LayerMaterial::bind_for_submesh`] then uploads
//! the per-draw uniforms for the committed variant.

use glam::Vec3;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::errors::{MaterialError, Result};
use crate::material::macros::impl_setting_accessors;
use crate::renderer::binding::{FrameContext, UniformSink};
use crate::renderer::cache_slot::{CacheSlot, DirtyCategories};
use crate::renderer::drawable::{DrawableState, SceneFlags};
use crate::renderer::lighting::LightingPreparer;
use crate::renderer::program::{CompileStatus, ProgramCache, ProgramHandle, ProgramRequest};
use crate::renderer::resolver::{ResolutionOutcome, ResolveOptions, resolve};
use crate::resources::{ChangeTracker, MutGuard, TextureRef};
use crate::settings::ResolverConfig;
use crate::utils::interner;

pub const CLASS_NAME: &str = "LayerMaterial";

/// Strength of the parallax-free bump offset passed in `vBumpInfos.z`.
const BUMP_HEIGHT_SCALE: f32 = 0.05;

/// User-facing state of a layer material.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMaterialSettings {
    pub diffuse_texture: Option<TextureRef>,
    pub bump_texture: Option<TextureRef>,
    pub background_color: Vec3,
    pub specular_color: Vec3,
    pub specular_power: f32,
    pub disable_lighting: bool,
    pub max_simultaneous_lights: u32,
    pub invert_normal_map_x: bool,
    pub invert_normal_map_y: bool,
    pub alpha: f32,
    pub fog_enabled: bool,
    pub points_cloud: bool,
    pub point_size: f32,
}

impl Default for LayerMaterialSettings {
    fn default() -> Self {
        Self {
            diffuse_texture: None,
            bump_texture: None,
            background_color: Vec3::new(1.0, 0.0, 1.0),
            specular_color: Vec3::ONE,
            specular_power: 64.0,
            disable_lighting: false,
            max_simultaneous_lights: 4,
            invert_normal_map_x: false,
            invert_normal_map_y: false,
            alpha: 1.0,
            fog_enabled: true,
            points_cloud: false,
            point_size: 1.0,
        }
    }
}

impl LayerMaterialSettings {
    /// Define categories affected by the differences from `previous`.
    /// Settings that only feed uniforms (colors, sizes) never dirty a
    /// category.
    #[must_use]
    pub fn dirty_categories(&self, previous: Option<&Self>) -> DirtyCategories {
        let Some(prev) = previous else {
            return DirtyCategories::all();
        };

        let mut dirty = DirtyCategories::empty();
        if self.diffuse_texture != prev.diffuse_texture
            || self.bump_texture != prev.bump_texture
            || self.invert_normal_map_x != prev.invert_normal_map_x
            || self.invert_normal_map_y != prev.invert_normal_map_y
        {
            dirty |= DirtyCategories::TEXTURES;
        }
        if self.disable_lighting != prev.disable_lighting
            || self.max_simultaneous_lights != prev.max_simultaneous_lights
        {
            dirty |= DirtyCategories::LIGHTS;
        }
        if self.points_cloud != prev.points_cloud
            || self.fog_enabled != prev.fog_enabled
            || self.needs_alpha_blending() != prev.needs_alpha_blending()
        {
            dirty |= DirtyCategories::MISC;
        }
        dirty
    }

    /// The diffuse texture, when it would actually be sampled.
    #[must_use]
    pub fn active_diffuse(&self, config: &ResolverConfig, scene: &SceneFlags) -> Option<&TextureRef> {
        self.diffuse_texture
            .as_ref()
            .filter(|_| scene.textures_enabled && config.diffuse_texture_enabled)
    }

    /// The bump texture, when it would actually be sampled. Needs
    /// screen-space derivatives on top of the channel switches.
    #[must_use]
    pub fn active_bump(&self, config: &ResolverConfig, scene: &SceneFlags) -> Option<&TextureRef> {
        self.bump_texture.as_ref().filter(|_| {
            scene.textures_enabled && config.bump_texture_enabled && scene.standard_derivatives
        })
    }

    #[must_use]
    pub fn needs_alpha_blending(&self) -> bool {
        self.alpha < 1.0
    }

    #[must_use]
    pub fn needs_alpha_testing(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct LayerMaterial {
    pub uuid: Uuid,
    pub name: String,
    pub(crate) settings: LayerMaterialSettings,
    pub(crate) version: ChangeTracker,
    config: ResolverConfig,
    frozen: bool,
    check_ready_on_every_call: bool,
}

impl LayerMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, ResolverConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: ResolverConfig) -> Self {
        interner::preload_common_macros();
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            settings: LayerMaterialSettings {
                max_simultaneous_lights: config.default_max_simultaneous_lights,
                ..LayerMaterialSettings::default()
            },
            version: ChangeTracker::new(),
            config,
            frozen: false,
            check_ready_on_every_call: false,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &LayerMaterialSettings {
        &self.settings
    }

    /// Bulk edit. The version is bumped when the guard drops.
    pub fn settings_mut(&mut self) -> MutGuard<'_, LayerMaterialSettings> {
        MutGuard::new(&mut self.settings, &mut self.version)
    }

    /// Incremented on every effective settings change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.version()
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ResolverConfig) {
        if self.config != config {
            self.config = config;
            self.version.changed();
        }
    }

    #[must_use]
    pub fn class_name(&self) -> &'static str {
        CLASS_NAME
    }

    // --- Textures ---

    #[must_use]
    pub fn diffuse_texture(&self) -> Option<&TextureRef> {
        self.settings.diffuse_texture.as_ref()
    }

    pub fn set_diffuse_texture(&mut self, texture: Option<TextureRef>) {
        if self.settings.diffuse_texture != texture {
            self.settings.diffuse_texture = texture;
            self.version.changed();
        }
    }

    #[must_use]
    pub fn bump_texture(&self) -> Option<&TextureRef> {
        self.settings.bump_texture.as_ref()
    }

    pub fn set_bump_texture(&mut self, texture: Option<TextureRef>) {
        if self.settings.bump_texture != texture {
            self.settings.bump_texture = texture;
            self.version.changed();
        }
    }

    // --- Freezing ---

    /// A frozen material trusts its committed variants and skips
    /// re-resolution entirely.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_check_ready_on_every_call(&mut self, enabled: bool) {
        self.check_ready_on_every_call = enabled;
    }

    #[must_use]
    pub fn check_ready_on_every_call(&self) -> bool {
        self.check_ready_on_every_call || self.config.check_ready_on_every_call
    }

    // --- Material surface ---

    #[must_use]
    pub fn needs_alpha_blending(&self) -> bool {
        self.settings.needs_alpha_blending()
    }

    #[must_use]
    pub fn needs_alpha_testing(&self) -> bool {
        self.settings.needs_alpha_testing()
    }

    #[must_use]
    pub fn alpha_test_texture(&self) -> Option<&TextureRef> {
        self.settings.diffuse_texture.as_ref()
    }

    /// Textures the host must keep resident for this material.
    #[must_use]
    pub fn active_textures(&self) -> SmallVec<[TextureRef; 2]> {
        self.textures().cloned().collect()
    }

    /// Textures carrying animations the host should tick.
    #[must_use]
    pub fn animatable_textures(&self) -> SmallVec<[TextureRef; 2]> {
        self.textures()
            .filter(|texture| texture.has_animations())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_texture(&self, texture: &TextureRef) -> bool {
        self.textures().any(|t| t.same_texture(texture))
    }

    /// Copy with a fresh identity. Textures are shared, not duplicated.
    #[must_use]
    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            settings: self.settings.clone(),
            version: ChangeTracker::new(),
            config: self.config,
            frozen: false,
            check_ready_on_every_call: self.check_ready_on_every_call,
        }
    }

    fn textures(&self) -> impl Iterator<Item = &TextureRef> {
        [&self.settings.diffuse_texture, &self.settings.bump_texture]
            .into_iter()
            .flatten()
    }

    // --- Resolution ---

    /// Resolves the variant for one drawable and commits it once the host
    /// reports its program ready.
    ///
    /// Returns `Ok(false)` while a texture or the program is still loading.
    /// A committed program the host has since freed clears the slot and
    /// returns [`MaterialError::InvalidSlotState`]; the next call starts
    /// over.
    pub fn is_ready_for_submesh(
        &self,
        drawable: &DrawableState,
        slot: &mut CacheSlot,
        render_id: u64,
        lighting: &dyn LightingPreparer,
        programs: &mut dyn ProgramCache,
    ) -> Result<bool> {
        if let Some(handle) = slot.program()
            && !programs.is_valid(handle)
        {
            log::warn!("Material '{}': committed program {handle:?} was freed by the host", self.name);
            slot.invalidate();
            return Err(MaterialError::InvalidSlotState(format!(
                "program {handle:?} is no longer valid"
            )));
        }

        let options = ResolveOptions {
            frozen: self.frozen,
            check_ready_on_every_call: self.check_ready_on_every_call(),
            render_id,
        };

        match resolve(&self.settings, &self.config, drawable, slot, options, lighting) {
            ResolutionOutcome::NotReady => Ok(false),
            ResolutionOutcome::Cached => Ok(true),
            ResolutionOutcome::Recompile { key, flags } => {
                let request =
                    ProgramRequest::for_variant(&key, &flags, self.settings.max_simultaneous_lights);

                match programs.compile(&request) {
                    CompileStatus::Ready(handle) => {
                        log::debug!("Material '{}': committed variant {key} as {handle:?}", self.name);
                        slot.commit(handle, key, flags, render_id, &self.settings, &self.config, drawable);
                        Ok(true)
                    }
                    CompileStatus::Pending(_) => {
                        log::trace!("Material '{}': variant {key} still compiling", self.name);
                        Ok(false)
                    }
                    CompileStatus::Failed(reason) => {
                        log::warn!("Material '{}': variant {key} failed to compile: {reason}", self.name);
                        Err(MaterialError::ProgramCompileFailed {
                            shader: request.shader_name.to_string(),
                            reason,
                        })
                    }
                }
            }
        }
    }

    /// [`Self::is_ready_for_submesh`] for callers that treat "not ready yet"
    /// as an error at their own boundary: `Ok(false)` becomes
    /// [`MaterialError::ResourceNotReady`].
    pub fn require_ready_for_submesh(
        &self,
        drawable: &DrawableState,
        slot: &mut CacheSlot,
        render_id: u64,
        lighting: &dyn LightingPreparer,
        programs: &mut dyn ProgramCache,
    ) -> Result<()> {
        if self.is_ready_for_submesh(drawable, slot, render_id, lighting, programs)? {
            Ok(())
        } else {
            Err(MaterialError::ResourceNotReady(format!(
                "material '{}' is waiting on a texture or program",
                self.name
            )))
        }
    }

    // --- Binding ---

    fn must_rebind(&self, slot: &CacheSlot, program: ProgramHandle) -> bool {
        !self.frozen || slot.needs_rebind(program, self.version())
    }

    /// Uploads the per-draw uniforms for the variant committed in `slot`.
    /// Does nothing when the slot holds no variant.
    pub fn bind_for_submesh(
        &self,
        frame: &FrameContext<'_>,
        drawable: &DrawableState,
        slot: &mut CacheSlot,
        lighting: &dyn LightingPreparer,
        sink: &mut dyn UniformSink,
    ) {
        let Some(committed) = slot.committed() else {
            return;
        };
        let program = committed.program;
        let flags = committed.flags;
        let settings = &self.settings;
        let scene = &drawable.scene;

        // Matrices
        sink.set_matrix("world", &frame.world);
        sink.set_matrix("viewProjection", &frame.view_projection);

        // Bones
        if flags.num_bone_influencers > 0 && !frame.bone_matrices.is_empty() {
            sink.set_matrices("mBones", frame.bone_matrices);
        }

        if self.must_rebind(slot, program) {
            if flags.diffuse
                && let Some(diffuse) = &settings.diffuse_texture
            {
                sink.set_texture("diffuseSampler", diffuse);
                sink.set_float2("vDiffuseInfos", diffuse.coordinates_index() as f32, diffuse.level());
                sink.set_matrix("diffuseMatrix", &diffuse.texture_matrix());
            }

            if flags.bump
                && let Some(bump) = &settings.bump_texture
            {
                sink.set_texture("bumpSampler", bump);
                sink.set_matrix("bumpMatrix", &bump.texture_matrix());
                sink.set_float3(
                    "vBumpInfos",
                    bump.coordinates_index() as f32,
                    1.0 / bump.level(),
                    BUMP_HEIGHT_SCALE,
                );

                let sign = |inverted: bool| -> f32 { if inverted { -1.0 } else { 1.0 } };
                let mut x = sign(settings.invert_normal_map_x);
                let mut y = sign(settings.invert_normal_map_y);
                if frame.is_mirrored() {
                    x = -x;
                    y = -y;
                }
                sink.set_float2("vTangentSpaceParams", x, y);
            }

            if let Some(plane) = scene.clip_plane {
                sink.set_float4("vClipPlane", plane.x, plane.y, plane.z, plane.w);
            }

            if settings.points_cloud {
                sink.set_float("pointSize", settings.point_size);
            }

            if flags.specular_term {
                sink.set_color4("vSpecularColor", settings.specular_color, settings.specular_power);
            }

            sink.set_vector3(
                "vEyePosition",
                frame.mirrored_eye_position.unwrap_or(frame.eye_position),
            );

            slot.mark_bound(program, self.version());
        }

        sink.set_color4(
            "vBackgroundColor",
            settings.background_color,
            settings.alpha * frame.visibility,
        );

        // Lights
        if scene.lights_enabled && !settings.disable_lighting {
            lighting.bind_lights(drawable, sink, settings.max_simultaneous_lights);
        }

        // Fog
        if scene.fog.is_active() && drawable.mesh.apply_fog {
            let fog = &scene.fog;
            sink.set_matrix("view", &frame.view);
            sink.set_float4("vFogInfos", fog.mode.as_uniform(), fog.start, fog.end, fog.density);
            sink.set_color3("vFogColor", fog.color);
        }
    }
}

impl_setting_accessors!(LayerMaterial {
    /// Color shown where the diffuse layer is transparent.
    (background_color, set_background_color, Vec3),
    (specular_color, set_specular_color, Vec3),
    (specular_power, set_specular_power, f32),
    (disable_lighting, set_disable_lighting, bool),
    /// Light budget of the shader's light loop.
    (max_simultaneous_lights, set_max_simultaneous_lights, u32),
    (invert_normal_map_x, set_invert_normal_map_x, bool),
    (invert_normal_map_y, set_invert_normal_map_y, bool),
    /// Global opacity; below 1.0 the material is alpha blended.
    (alpha, set_alpha, f32),
    (fog_enabled, set_fog_enabled, bool),
    (points_cloud, set_points_cloud, bool),
    (point_size, set_point_size, f32),
});
