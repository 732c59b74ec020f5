//! Lighting preparation
//!
//! Light selection belongs to the host. The resolver treats it as a pure
//! function of (drawable, light list, max lights, lighting disabled) that
//! yields the light-derived defines, reached through [`LightingPreparer`].
//!
//! [`SceneLights`] is a straightforward implementation over a flat light
//! list for hosts without their own light management.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::renderer::binding::UniformSink;
use crate::renderer::drawable::DrawableState;
use crate::resources::TextureRef;

/// Light-derived part of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightingDefines {
    /// Number of `LIGHT{i}` slots in use.
    pub light_count: u32,
    /// Bit `i` set when light slot `i` samples a shadow map.
    pub shadow_mask: u32,
    /// At least one light contributes a specular term.
    pub specular_term: bool,
    /// Lighting needs vertex normals.
    pub needs_normals: bool,
}

/// Host routine producing light defines and binding light uniforms.
pub trait LightingPreparer {
    fn prepare_lights(
        &self,
        drawable: &DrawableState,
        max_lights: u32,
        disable_lighting: bool,
    ) -> LightingDefines;

    /// Writes per-light uniforms for the lights selected by `prepare_lights`.
    fn bind_lights(&self, drawable: &DrawableState, sink: &mut dyn UniformSink, max_lights: u32) {
        let _ = (drawable, sink, max_lights);
    }
}

/// A host with no lights at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLights;

impl LightingPreparer for NoLights {
    fn prepare_lights(&self, _: &DrawableState, _: u32, _: bool) -> LightingDefines {
        LightingDefines::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
    Spot,
    Hemispheric,
}

impl LightKind {
    fn type_index(self) -> f32 {
        match self {
            LightKind::Point => 0.0,
            LightKind::Directional => 1.0,
            LightKind::Spot => 2.0,
            LightKind::Hemispheric => 3.0,
        }
    }
}

/// Shadow map of one light, produced by the host's shadow generator.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    pub texture: TextureRef,
    /// World to light clip space.
    pub light_matrix: Mat4,
    /// Darkness, map size, bias and depth scale.
    pub info: Vec4,
    /// Near and far depth of the light camera.
    pub depth_values: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightInfo {
    pub kind: LightKind,
    pub enabled: bool,
    pub shadow: Option<ShadowMap>,
    pub position: Vec3,
    pub direction: Vec3,
    pub range: f32,
    pub intensity: f32,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Ground color for hemispheric lights.
    pub ground: Vec3,
    /// Cosine of the half cone angle for spot lights.
    pub spot_cos_angle: f32,
    pub spot_exponent: f32,
}

impl LightInfo {
    #[must_use]
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            enabled: true,
            shadow: None,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Y,
            range: f32::MAX,
            intensity: 1.0,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            ground: Vec3::ZERO,
            spot_cos_angle: 0.5,
            spot_exponent: 2.0,
        }
    }

    fn has_specular(&self) -> bool {
        self.specular != Vec3::ZERO
    }

    fn shadow_in(&self, drawable: &DrawableState) -> Option<&ShadowMap> {
        self.shadow.as_ref().filter(|_| drawable.scene.shadows_enabled)
    }
}

/// Flat list of scene lights, selected in order.
#[derive(Debug, Clone, Default)]
pub struct SceneLights {
    pub lights: Vec<LightInfo>,
}

impl SceneLights {
    #[must_use]
    pub fn new(lights: Vec<LightInfo>) -> Self {
        Self { lights }
    }

    fn selected(&self, max_lights: u32) -> impl Iterator<Item = &LightInfo> {
        self.lights
            .iter()
            .filter(|light| light.enabled)
            .take(max_lights.min(32) as usize)
    }
}

impl LightingPreparer for SceneLights {
    fn prepare_lights(
        &self,
        drawable: &DrawableState,
        max_lights: u32,
        disable_lighting: bool,
    ) -> LightingDefines {
        if disable_lighting || !drawable.scene.lights_enabled {
            return LightingDefines::default();
        }

        let mut defines = LightingDefines::default();
        for (index, light) in self.selected(max_lights).enumerate() {
            defines.light_count += 1;
            if light.shadow_in(drawable).is_some() {
                defines.shadow_mask |= 1 << index;
            }
            if light.has_specular() {
                defines.specular_term = true;
            }
        }
        defines.needs_normals = defines.light_count > 0;
        defines
    }

    fn bind_lights(&self, drawable: &DrawableState, sink: &mut dyn UniformSink, max_lights: u32) {
        for (index, light) in self.selected(max_lights).enumerate() {
            let diffuse = light.diffuse * light.intensity;
            let specular = light.specular * light.intensity;

            match light.kind {
                LightKind::Point => {
                    let p = light.position;
                    sink.set_float4(&format!("vLightData{index}"), p.x, p.y, p.z, 0.0);
                }
                LightKind::Directional => {
                    let d = light.direction;
                    sink.set_float4(&format!("vLightData{index}"), d.x, d.y, d.z, 1.0);
                }
                LightKind::Spot => {
                    let p = light.position;
                    let d = light.direction.normalize_or_zero();
                    sink.set_float4(&format!("vLightData{index}"), p.x, p.y, p.z, light.spot_exponent);
                    sink.set_float4(&format!("vLightDirection{index}"), d.x, d.y, d.z, light.spot_cos_angle);
                }
                LightKind::Hemispheric => {
                    let d = light.direction.normalize_or_zero();
                    sink.set_float4(&format!("vLightData{index}"), d.x, d.y, d.z, 0.0);
                    sink.set_color3(&format!("vLightGround{index}"), light.ground * light.intensity);
                }
            }

            sink.set_float4(&format!("vLightDiffuse{index}"), diffuse.x, diffuse.y, diffuse.z, light.range);
            sink.set_float4(
                &format!("vLightSpecular{index}"),
                specular.x,
                specular.y,
                specular.z,
                light.kind.type_index(),
            );

            if let Some(shadow) = light.shadow_in(drawable) {
                let info = shadow.info;
                sink.set_texture(&format!("shadowSampler{index}"), &shadow.texture);
                sink.set_matrix(&format!("lightMatrix{index}"), &shadow.light_matrix);
                sink.set_float4(&format!("shadowsInfo{index}"), info.x, info.y, info.z, info.w);
                sink.set_float2(
                    &format!("depthValues{index}"),
                    shadow.depth_values.x,
                    shadow.depth_values.y,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::renderer::binding::{BoundValue, RecordingSink};
    use crate::resources::TextureResource;

    struct DepthMap;

    impl TextureResource for DepthMap {
        fn name(&self) -> &str {
            "shadowMap"
        }
        fn is_ready(&self) -> bool {
            true
        }
        fn has_alpha(&self) -> bool {
            false
        }
    }

    fn shadowed_point() -> LightInfo {
        LightInfo {
            shadow: Some(ShadowMap {
                texture: TextureRef::from(Arc::new(DepthMap)),
                light_matrix: Mat4::from_translation(Vec3::Y),
                info: Vec4::new(0.5, 1024.0, 0.0005, 1.0),
                depth_values: Vec2::new(0.1, 100.0),
            }),
            ..LightInfo::new(LightKind::Point)
        }
    }

    #[test]
    fn disabled_lighting_yields_no_defines() {
        let lights = SceneLights::new(vec![LightInfo::new(LightKind::Point)]);
        let defines = lights.prepare_lights(&DrawableState::default(), 4, true);
        assert_eq!(defines, LightingDefines::default());
    }

    #[test]
    fn max_lights_caps_selection() {
        let lights = SceneLights::new(vec![LightInfo::new(LightKind::Point); 6]);
        let defines = lights.prepare_lights(&DrawableState::default(), 4, false);
        assert_eq!(defines.light_count, 4);
        assert!(defines.needs_normals);
        assert!(defines.specular_term);
    }

    #[test]
    fn shadow_mask_tracks_slot_index() {
        let mut no_specular = LightInfo::new(LightKind::Directional);
        no_specular.specular = Vec3::ZERO;
        let lights = SceneLights::new(vec![no_specular, shadowed_point()]);

        let defines = lights.prepare_lights(&DrawableState::default(), 4, false);
        assert_eq!(defines.shadow_mask, 0b10);

        let mut no_shadows = DrawableState::default();
        no_shadows.scene.shadows_enabled = false;
        assert_eq!(lights.prepare_lights(&no_shadows, 4, false).shadow_mask, 0);
    }

    #[test]
    fn shadowed_slots_bind_shadow_uniforms() {
        let lights = SceneLights::new(vec![LightInfo::new(LightKind::Directional), shadowed_point()]);
        let mut sink = RecordingSink::new();
        lights.bind_lights(&DrawableState::default(), &mut sink, 4);

        assert!(!sink.contains("shadowSampler0"));
        assert!(!sink.contains("lightMatrix0"));
        assert!(matches!(sink.get("shadowSampler1"), Some(BoundValue::Texture(t)) if t.name() == "shadowMap"));
        assert!(matches!(
            sink.get("lightMatrix1"),
            Some(BoundValue::Matrix(m)) if *m == Mat4::from_translation(Vec3::Y)
        ));
        assert_eq!(sink.float4("shadowsInfo1"), Some(Vec4::new(0.5, 1024.0, 0.0005, 1.0)));
        assert!(matches!(sink.get("depthValues1"), Some(BoundValue::Float2(n, f)) if *n == 0.1 && *f == 100.0));

        let mut no_shadows = DrawableState::default();
        no_shadows.scene.shadows_enabled = false;
        let mut unshadowed = RecordingSink::new();
        lights.bind_lights(&no_shadows, &mut unshadowed, 4);
        assert!(unshadowed.contains("vLightData1"));
        assert!(!unshadowed.contains("shadowSampler1"));
    }

    #[test]
    fn disabled_lights_are_skipped() {
        let mut off = LightInfo::new(LightKind::Spot);
        off.enabled = false;
        let lights = SceneLights::new(vec![off]);
        let defines = lights.prepare_lights(&DrawableState::default(), 4, false);
        assert_eq!(defines.light_count, 0);
        assert!(!defines.needs_normals);
    }
}
