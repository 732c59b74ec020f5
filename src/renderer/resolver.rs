//! Shader variant resolution
//!
//! [`resolve`] decides, for one drawable in one pass, whether the variant
//! committed in its [`CacheSlot`] can be reused or a new one is required.
//! It never touches the committed variant: a `Recompile` outcome carries the
//! new flags and key, and the caller commits them together with a ready
//! program handle.
//!
//! Order of checks:
//! 1. frozen material with a ready slot
//! 2. same render pass, nothing dirty (unless readiness is checked on every call)
//! 3. texture readiness gate
//! 4. flag derivation and comparison with the committed flags

use crate::material::LayerMaterialSettings;
use crate::material::defines::{FeatureFlags, VariantKey, slot_mask};
use crate::renderer::cache_slot::CacheSlot;
use crate::renderer::drawable::DrawableState;
use crate::renderer::lighting::LightingPreparer;
use crate::resources::TextureRef;
use crate::settings::ResolverConfig;

/// Per-call switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveOptions {
    pub frozen: bool,
    pub check_ready_on_every_call: bool,
    /// Id of the current render pass.
    pub render_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// A texture is still loading. The slot is untouched.
    NotReady,
    /// The committed variant is still valid.
    Cached,
    /// A different variant is needed.
    Recompile { key: VariantKey, flags: FeatureFlags },
}

pub fn resolve(
    settings: &LayerMaterialSettings,
    config: &ResolverConfig,
    drawable: &DrawableState,
    slot: &mut CacheSlot,
    options: ResolveOptions,
    lighting: &dyn LightingPreparer,
) -> ResolutionOutcome {
    if options.frozen && slot.is_ready() {
        log::trace!("Frozen material, reusing committed variant");
        return ResolutionOutcome::Cached;
    }

    let dirty = slot.dirty_against(settings, config, drawable);

    if !options.check_ready_on_every_call
        && slot.is_ready()
        && slot.render_id() == Some(options.render_id)
        && dirty.is_empty()
    {
        log::trace!("Variant already resolved for render pass {}", options.render_id);
        return ResolutionOutcome::Cached;
    }

    if let Some(texture) = first_unready_texture(settings, config, drawable) {
        log::trace!("Texture '{}' not ready, deferring variant", texture.name());
        return ResolutionOutcome::NotReady;
    }

    slot.note_recompute();
    let flags = derive_flags(settings, config, drawable, lighting);

    if slot.flags() == Some(&flags) {
        slot.refresh(options.render_id, dirty, settings, config, drawable);
        return ResolutionOutcome::Cached;
    }

    let key = flags.variant_key();
    log::debug!("Variant changed ({dirty:?} dirty), new key {key}");
    ResolutionOutcome::Recompile { key, flags }
}

fn first_unready_texture<'a>(
    settings: &'a LayerMaterialSettings,
    config: &ResolverConfig,
    drawable: &DrawableState,
) -> Option<&'a TextureRef> {
    [
        settings.active_diffuse(config, &drawable.scene),
        settings.active_bump(config, &drawable.scene),
    ]
    .into_iter()
    .flatten()
    .find(|texture| !texture.is_ready())
}

/// Derives the full flag set. Pure: the result depends only on the inputs,
/// never on the order flags are filled in or on previous passes.
#[must_use]
pub fn derive_flags(
    settings: &LayerMaterialSettings,
    config: &ResolverConfig,
    drawable: &DrawableState,
    lighting: &dyn LightingPreparer,
) -> FeatureFlags {
    let mut flags = FeatureFlags::default();
    let mesh = &drawable.mesh;
    let scene = &drawable.scene;

    // Textures
    let diffuse = settings.active_diffuse(config, scene);
    let bump = settings.active_bump(config, scene);
    let mut need_uvs = false;

    if diffuse.is_some() {
        need_uvs = true;
        flags.diffuse = true;
    }
    if let Some(bump) = bump {
        need_uvs = true;
        prepare_merged_uv_bump(bump, &mut flags);
    }
    flags.alpha_from_diffuse = settings
        .diffuse_texture
        .as_ref()
        .is_some_and(|texture| texture.has_alpha());

    // Misc
    flags.point_size = settings.points_cloud;
    flags.fog = scene.fog.is_active() && mesh.apply_fog && settings.fog_enabled;
    flags.alpha_test = settings.needs_alpha_testing() && !settings.needs_alpha_blending();

    // Lights
    let lights = lighting.prepare_lights(
        drawable,
        settings.max_simultaneous_lights,
        settings.disable_lighting,
    );
    flags.light_count = lights.light_count;
    flags.shadow_mask = lights.shadow_mask & slot_mask(lights.light_count);
    flags.specular_term = lights.specular_term;

    // Frame bound
    flags.clip_plane = scene.clip_plane.is_some();
    flags.instances = drawable.use_instances;

    // Attributes
    flags.normal = lights.needs_normals && mesh.has_normals;
    flags.uv1 = need_uvs && mesh.has_uv1;
    flags.uv2 = need_uvs && mesh.has_uv2;
    flags.vertex_color = mesh.use_vertex_colors && mesh.has_colors;
    flags.vertex_alpha = flags.vertex_color && mesh.has_vertex_alpha;
    if mesh.uses_gpu_bones() {
        flags.num_bone_influencers = mesh.bone_influencers;
        flags.bones_per_mesh = mesh.bone_count + 1;
    }

    flags
}

/// An identity texture matrix lets the vertex stage forward its UV channel
/// directly (`BUMPDIRECTUV = channel + 1`); otherwise UVs are transformed.
fn prepare_merged_uv_bump(bump: &TextureRef, flags: &mut FeatureFlags) {
    flags.bump = true;
    if bump.has_identity_matrix() {
        let channel = bump.coordinates_index();
        flags.bump_direct_uv = channel + 1;
        match channel {
            0 => flags.main_uv1 = true,
            1 => flags.main_uv2 = true,
            _ => {}
        }
    } else {
        flags.bump_direct_uv = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Mat4, Vec3, Vec4};

    use super::*;
    use crate::renderer::drawable::{FogMode, FogSettings, MeshAttributes};
    use crate::renderer::lighting::{LightInfo, LightKind, LightingDefines, NoLights, SceneLights};
    use crate::resources::TextureResource;

    struct Tex {
        ready: bool,
        alpha: bool,
        coords: u32,
        matrix: Mat4,
    }

    impl TextureResource for Tex {
        fn name(&self) -> &str {
            "tex"
        }
        fn is_ready(&self) -> bool {
            self.ready
        }
        fn has_alpha(&self) -> bool {
            self.alpha
        }
        fn coordinates_index(&self) -> u32 {
            self.coords
        }
        fn texture_matrix(&self) -> Mat4 {
            self.matrix
        }
    }

    fn tex(coords: u32, matrix: Mat4) -> TextureRef {
        TextureRef::from(Arc::new(Tex {
            ready: true,
            alpha: false,
            coords,
            matrix,
        }))
    }

    fn derive(settings: &LayerMaterialSettings, drawable: &DrawableState) -> FeatureFlags {
        derive_flags(settings, &ResolverConfig::default(), drawable, &NoLights)
    }

    #[test]
    fn bump_with_identity_matrix_uses_direct_uv() {
        let settings = LayerMaterialSettings {
            bump_texture: Some(tex(1, Mat4::IDENTITY)),
            ..LayerMaterialSettings::default()
        };
        let flags = derive(&settings, &DrawableState::default());

        assert!(flags.bump);
        assert_eq!(flags.bump_direct_uv, 2);
        assert!(flags.main_uv2);
        assert!(!flags.main_uv1);
    }

    #[test]
    fn bump_with_transformed_uvs_disables_direct_uv() {
        let settings = LayerMaterialSettings {
            bump_texture: Some(tex(0, Mat4::from_scale(Vec3::splat(2.0)))),
            ..LayerMaterialSettings::default()
        };
        let flags = derive(&settings, &DrawableState::default());

        assert!(flags.bump);
        assert_eq!(flags.bump_direct_uv, 0);
        assert!(!flags.main_uv1);
    }

    #[test]
    fn bump_requires_standard_derivatives() {
        let settings = LayerMaterialSettings {
            bump_texture: Some(tex(0, Mat4::IDENTITY)),
            ..LayerMaterialSettings::default()
        };
        let mut drawable = DrawableState::default();
        drawable.scene.standard_derivatives = false;

        assert!(!derive(&settings, &drawable).bump);
    }

    #[test]
    fn uvs_follow_texture_usage() {
        let mut drawable = DrawableState::default();
        drawable.mesh.has_uv1 = true;
        drawable.mesh.has_uv2 = true;

        let plain = derive(&LayerMaterialSettings::default(), &drawable);
        assert!(!plain.uv1 && !plain.uv2);

        let textured = LayerMaterialSettings {
            diffuse_texture: Some(tex(0, Mat4::IDENTITY)),
            ..LayerMaterialSettings::default()
        };
        let flags = derive(&textured, &drawable);
        assert!(flags.uv1 && flags.uv2);
        assert_eq!(flags.diffuse_direct_uv, 0);
    }

    #[test]
    fn fog_needs_scene_mesh_and_material() {
        let mut drawable = DrawableState::default();
        drawable.scene.fog = FogSettings {
            enabled: true,
            mode: FogMode::Exp,
            ..FogSettings::default()
        };
        let settings = LayerMaterialSettings::default();
        assert!(!derive(&settings, &drawable).fog);

        drawable.mesh.apply_fog = true;
        assert!(derive(&settings, &drawable).fog);

        let no_fog = LayerMaterialSettings {
            fog_enabled: false,
            ..LayerMaterialSettings::default()
        };
        assert!(!derive(&no_fog, &drawable).fog);
    }

    #[test]
    fn misc_and_frame_bound_flags() {
        let mut drawable = DrawableState::default();
        drawable.scene.clip_plane = Some(Vec4::Y);
        drawable.use_instances = true;
        let settings = LayerMaterialSettings {
            points_cloud: true,
            alpha: 0.5,
            ..LayerMaterialSettings::default()
        };

        let flags = derive(&settings, &drawable);
        assert!(flags.clip_plane);
        assert!(flags.instances);
        assert!(flags.point_size);
        assert!(!flags.alpha_test);
    }

    #[test]
    fn gpu_bones_set_influencers_and_bone_count() {
        let mut drawable = DrawableState::default();
        drawable.mesh = MeshAttributes {
            bone_influencers: 4,
            bone_count: 20,
            compute_bones_using_shaders: true,
            ..MeshAttributes::default()
        };

        let flags = derive(&LayerMaterialSettings::default(), &drawable);
        assert_eq!(flags.num_bone_influencers, 4);
        assert_eq!(flags.bones_per_mesh, 21);

        drawable.mesh.compute_bones_using_shaders = false;
        let cpu = derive(&LayerMaterialSettings::default(), &drawable);
        assert_eq!(cpu.num_bone_influencers, 0);
        assert_eq!(cpu.bones_per_mesh, 0);
    }

    #[test]
    fn vertex_alpha_requires_vertex_color() {
        let mut drawable = DrawableState::default();
        drawable.mesh.has_vertex_alpha = true;
        drawable.mesh.has_colors = true;
        assert!(!derive(&LayerMaterialSettings::default(), &drawable).vertex_alpha);

        drawable.mesh.use_vertex_colors = true;
        let flags = derive(&LayerMaterialSettings::default(), &drawable);
        assert!(flags.vertex_color && flags.vertex_alpha);
    }

    #[test]
    fn normals_only_when_lighting_needs_them() {
        let mut drawable = DrawableState::default();
        drawable.mesh.has_normals = true;
        let lights = SceneLights::new(vec![LightInfo::new(LightKind::Hemispheric)]);
        let settings = LayerMaterialSettings::default();
        let config = ResolverConfig::default();

        assert!(derive_flags(&settings, &config, &drawable, &lights).normal);
        assert!(!derive_flags(&settings, &config, &drawable, &NoLights).normal);

        let unlit = LayerMaterialSettings {
            disable_lighting: true,
            ..LayerMaterialSettings::default()
        };
        let flags = derive_flags(&unlit, &config, &drawable, &lights);
        assert!(!flags.normal);
        assert_eq!(flags.light_count, 0);
    }

    struct StrayShadowBits;

    impl LightingPreparer for StrayShadowBits {
        fn prepare_lights(&self, _: &DrawableState, _: u32, _: bool) -> LightingDefines {
            LightingDefines {
                light_count: 1,
                shadow_mask: 0b110,
                specular_term: false,
                needs_normals: true,
            }
        }
    }

    #[test]
    fn shadow_bits_past_light_count_are_dropped() {
        let settings = LayerMaterialSettings::default();
        let flags = derive_flags(&settings, &ResolverConfig::default(), &DrawableState::default(), &StrayShadowBits);

        assert_eq!(flags.light_count, 1);
        assert_eq!(flags.shadow_mask, 0);
        assert!(!flags.to_defines().contains("SHADOWS"));
    }

    #[test]
    fn unready_unused_texture_does_not_gate() {
        let pending = TextureRef::from(Arc::new(Tex {
            ready: false,
            alpha: false,
            coords: 0,
            matrix: Mat4::IDENTITY,
        }));
        let settings = LayerMaterialSettings {
            diffuse_texture: Some(pending),
            ..LayerMaterialSettings::default()
        };
        let config = ResolverConfig {
            diffuse_texture_enabled: false,
            ..ResolverConfig::default()
        };
        let mut slot = CacheSlot::new();

        let outcome = resolve(
            &settings,
            &config,
            &DrawableState::default(),
            &mut slot,
            ResolveOptions::default(),
            &NoLights,
        );
        assert!(matches!(outcome, ResolutionOutcome::Recompile { flags, .. } if !flags.diffuse));
    }
}
