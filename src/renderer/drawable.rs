//! Drawable and scene state
//!
//! Plain snapshots of the host state the resolver reads: which vertex
//! attributes the mesh provides, and which scene-wide features (textures,
//! lights, fog, clip plane) are active for this pass.

use glam::{Vec3, Vec4};

use crate::renderer::cache_slot::DirtyCategories;

/// Vertex attribute availability of one drawable (mesh subdivision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshAttributes {
    pub has_normals: bool,
    pub has_uv1: bool,
    pub has_uv2: bool,
    pub has_colors: bool,
    /// The mesh wants its color attribute to be used.
    pub use_vertex_colors: bool,
    pub has_vertex_alpha: bool,
    /// Influencers per vertex; 0 when the mesh is not skinned.
    pub bone_influencers: u32,
    /// Bones in the skeleton driving the mesh.
    pub bone_count: u32,
    /// Skinning happens on the GPU. When `false` the host skins on the CPU
    /// and the shader sees an unskinned mesh.
    pub compute_bones_using_shaders: bool,
    pub apply_fog: bool,
}

impl MeshAttributes {
    #[must_use]
    pub fn uses_gpu_bones(&self) -> bool {
        self.bone_influencers > 0 && self.bone_count > 0 && self.compute_bones_using_shaders
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FogMode {
    #[default]
    None,
    Exp,
    Exp2,
    Linear,
}

impl FogMode {
    /// Numeric mode as consumed by the fog shader chunk.
    #[must_use]
    pub fn as_uniform(self) -> f32 {
        match self {
            FogMode::None => 0.0,
            FogMode::Exp => 1.0,
            FogMode::Exp2 => 2.0,
            FogMode::Linear => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogSettings {
    pub enabled: bool,
    pub mode: FogMode,
    pub start: f32,
    pub end: f32,
    pub density: f32,
    pub color: Vec3,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: FogMode::None,
            start: 0.0,
            end: 1000.0,
            density: 0.1,
            color: Vec3::splat(0.2),
        }
    }
}

impl FogSettings {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.mode != FogMode::None
    }
}

/// Scene-wide switches for the current pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneFlags {
    pub textures_enabled: bool,
    pub lights_enabled: bool,
    pub shadows_enabled: bool,
    /// The device supports screen-space derivatives (required for bump).
    pub standard_derivatives: bool,
    pub fog: FogSettings,
    pub clip_plane: Option<Vec4>,
}

impl Default for SceneFlags {
    fn default() -> Self {
        Self {
            textures_enabled: true,
            lights_enabled: true,
            shadows_enabled: true,
            standard_derivatives: true,
            fog: FogSettings::default(),
            clip_plane: None,
        }
    }
}

/// Everything the resolver needs to know about one drawable in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawableState {
    pub mesh: MeshAttributes,
    pub scene: SceneFlags,
    /// Drawn through hardware instancing this pass.
    pub use_instances: bool,
}

impl DrawableState {
    /// Define categories affected by the differences from `previous`.
    ///
    /// Only state that can change a define is compared: the clip plane
    /// equation and fog parameters are bound as uniforms, so only their
    /// presence counts.
    #[must_use]
    pub fn dirty_categories(&self, previous: Option<&DrawableState>) -> DirtyCategories {
        let Some(prev) = previous else {
            return DirtyCategories::all();
        };

        let mut dirty = DirtyCategories::empty();
        if self.mesh != prev.mesh || self.use_instances != prev.use_instances {
            dirty |= DirtyCategories::ATTRIBUTES;
        }
        if self.scene.textures_enabled != prev.scene.textures_enabled
            || self.scene.standard_derivatives != prev.scene.standard_derivatives
        {
            dirty |= DirtyCategories::TEXTURES;
        }
        if self.scene.lights_enabled != prev.scene.lights_enabled
            || self.scene.shadows_enabled != prev.scene.shadows_enabled
        {
            dirty |= DirtyCategories::LIGHTS;
        }
        if self.scene.fog.is_active() != prev.scene.fog.is_active()
            || self.scene.clip_plane.is_some() != prev.scene.clip_plane.is_some()
        {
            dirty |= DirtyCategories::MISC;
        }
        dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_snapshot_is_fully_dirty() {
        let state = DrawableState::default();
        assert_eq!(state.dirty_categories(None), DirtyCategories::all());
    }

    #[test]
    fn clip_plane_value_change_is_not_dirty() {
        let mut a = DrawableState::default();
        a.scene.clip_plane = Some(Vec4::new(0.0, 1.0, 0.0, 0.0));
        let mut b = a;
        b.scene.clip_plane = Some(Vec4::new(0.0, 1.0, 0.0, 5.0));

        assert!(b.dirty_categories(Some(&a)).is_empty());
    }

    #[test]
    fn attribute_change_marks_attributes() {
        let a = DrawableState::default();
        let mut b = a;
        b.mesh.has_normals = true;
        b.scene.fog = FogSettings {
            enabled: true,
            mode: FogMode::Linear,
            ..FogSettings::default()
        };

        assert_eq!(
            b.dirty_categories(Some(&a)),
            DirtyCategories::ATTRIBUTES | DirtyCategories::MISC
        );
    }

    #[test]
    fn gpu_bones_need_shader_skinning() {
        let mut mesh = MeshAttributes {
            bone_influencers: 4,
            bone_count: 12,
            compute_bones_using_shaders: true,
            ..MeshAttributes::default()
        };
        assert!(mesh.uses_gpu_bones());

        mesh.compute_bones_using_shaders = false;
        assert!(!mesh.uses_gpu_bones());
    }
}
