//! Uniform binding
//!
//! Per-draw values flow to the host through [`UniformSink`]. The material
//! writes by uniform name; the host decides how names map to buffers and
//! bind groups.

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::resources::TextureRef;

/// Destination of per-draw uniform and sampler values.
pub trait UniformSink {
    fn set_matrix(&mut self, name: &str, value: &Mat4);
    fn set_matrices(&mut self, name: &str, values: &[Mat4]);
    fn set_float(&mut self, name: &str, value: f32);
    fn set_float2(&mut self, name: &str, x: f32, y: f32);
    fn set_float3(&mut self, name: &str, x: f32, y: f32, z: f32);
    fn set_float4(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32);
    fn set_texture(&mut self, name: &str, texture: &TextureRef);

    fn set_vector3(&mut self, name: &str, value: Vec3) {
        self.set_float3(name, value.x, value.y, value.z);
    }

    fn set_color3(&mut self, name: &str, color: Vec3) {
        self.set_float3(name, color.x, color.y, color.z);
    }

    fn set_color4(&mut self, name: &str, color: Vec3, alpha: f32) {
        self.set_float4(name, color.x, color.y, color.z, alpha);
    }
}

/// A value written through a [`UniformSink`].
#[derive(Debug, Clone)]
pub enum BoundValue {
    Matrix(Mat4),
    Matrices(Vec<Mat4>),
    Float(f32),
    Float2(f32, f32),
    Float3(Vec3),
    Float4(Vec4),
    Texture(TextureRef),
}

/// Sink that keeps the last value written per uniform name.
#[derive(Debug, Default)]
pub struct RecordingSink {
    values: FxHashMap<String, BoundValue>,
    writes: usize,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn float4(&self, name: &str) -> Option<Vec4> {
        match self.values.get(name)? {
            BoundValue::Float4(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn float3(&self, name: &str) -> Option<Vec3> {
        match self.values.get(name)? {
            BoundValue::Float3(v) => Some(*v),
            _ => None,
        }
    }

    /// Total number of writes, including overwrites.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.writes = 0;
    }

    fn record(&mut self, name: &str, value: BoundValue) {
        self.writes += 1;
        self.values.insert(name.to_string(), value);
    }
}

impl UniformSink for RecordingSink {
    fn set_matrix(&mut self, name: &str, value: &Mat4) {
        self.record(name, BoundValue::Matrix(*value));
    }

    fn set_matrices(&mut self, name: &str, values: &[Mat4]) {
        self.record(name, BoundValue::Matrices(values.to_vec()));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.record(name, BoundValue::Float(value));
    }

    fn set_float2(&mut self, name: &str, x: f32, y: f32) {
        self.record(name, BoundValue::Float2(x, y));
    }

    fn set_float3(&mut self, name: &str, x: f32, y: f32, z: f32) {
        self.record(name, BoundValue::Float3(Vec3::new(x, y, z)));
    }

    fn set_float4(&mut self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        self.record(name, BoundValue::Float4(Vec4::new(x, y, z, w)));
    }

    fn set_texture(&mut self, name: &str, texture: &TextureRef) {
        self.record(name, BoundValue::Texture(texture.clone()));
    }
}

/// Per-draw transforms and camera state supplied by the host.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub world: Mat4,
    pub view: Mat4,
    pub view_projection: Mat4,
    pub eye_position: Vec3,
    /// Eye position of a mirrored (reflection) camera, when rendering one.
    pub mirrored_eye_position: Option<Vec3>,
    /// Mesh visibility, multiplied into the output alpha.
    pub visibility: f32,
    /// Skinning matrices, empty for unskinned meshes.
    pub bone_matrices: &'a [Mat4],
}

impl Default for FrameContext<'_> {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            eye_position: Vec3::ZERO,
            mirrored_eye_position: None,
            visibility: 1.0,
            bone_matrices: &[],
        }
    }
}

impl FrameContext<'_> {
    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        self.mirrored_eye_position.is_some()
    }
}
