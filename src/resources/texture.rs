//! Host texture access
//!
//! Texture decoding and upload belong to the host engine. The material only
//! needs to poll a handful of properties, expressed by [`TextureResource`].
//! [`TextureRef`] is the shared handle a material stores per texture slot;
//! two refs are equal only when they point at the same host texture.

use std::fmt;
use std::sync::Arc;

use glam::Mat4;

/// Read-only view of a host texture.
pub trait TextureResource: Send + Sync {
    /// Name used by the serialization codec to find the texture again.
    fn name(&self) -> &str;

    /// `false` while the host is still loading or uploading the texture.
    fn is_ready(&self) -> bool;

    fn has_alpha(&self) -> bool;

    /// UV channel the texture samples from (0 or 1).
    fn coordinates_index(&self) -> u32 {
        0
    }

    /// Intensity / bump strength level.
    fn level(&self) -> f32 {
        1.0
    }

    fn texture_matrix(&self) -> Mat4 {
        Mat4::IDENTITY
    }

    /// Whether the texture has running animations the host must tick.
    fn has_animations(&self) -> bool {
        false
    }
}

/// Shared handle to a host texture.
#[derive(Clone)]
pub struct TextureRef(Arc<dyn TextureResource>);

impl TextureRef {
    pub fn new(texture: Arc<dyn TextureResource>) -> Self {
        Self(texture)
    }

    /// Whether both refs point at the same host texture.
    #[must_use]
    pub fn same_texture(&self, other: &TextureRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    /// The texture matrix is identity, so UVs can be forwarded directly
    /// from the vertex stage.
    #[must_use]
    pub fn has_identity_matrix(&self) -> bool {
        self.0.texture_matrix() == Mat4::IDENTITY
    }
}

impl<T: TextureResource + 'static> From<Arc<T>> for TextureRef {
    fn from(texture: Arc<T>) -> Self {
        Self(texture)
    }
}

impl std::ops::Deref for TextureRef {
    type Target = dyn TextureResource;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for TextureRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_texture(other)
    }
}

impl fmt::Debug for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureRef")
            .field("name", &self.0.name())
            .field("ready", &self.0.is_ready())
            .finish()
    }
}
