//! Layer material feature flags and variant keys
//!
//! [`FeatureFlags`] is the typed snapshot of every define the layer shader
//! understands. [`VariantKey`] is its canonical serialization: two snapshots
//! produce the same key exactly when every flag value matches, regardless of
//! the order in which the flags were computed.

use std::fmt;
use std::hash::{Hash, Hasher};

use xxhash_rust::xxh3::xxh3_64;

use crate::resources::ShaderDefines;

/// Defines of one layer material variant.
///
/// `shadow_mask` bits at or above `light_count` name no light slot; they are
/// ignored by equality, hashing and the define set alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFlags {
    // Textures
    pub diffuse: bool,
    pub diffuse_direct_uv: u32,
    pub bump: bool,
    pub bump_direct_uv: u32,
    pub main_uv1: bool,
    pub main_uv2: bool,
    pub alpha_from_diffuse: bool,

    // Misc
    pub clip_plane: bool,
    pub alpha_test: bool,
    pub point_size: bool,
    pub fog: bool,

    // Lights
    pub light_count: u32,
    pub shadow_mask: u32,
    pub specular_term: bool,

    // Attributes
    pub normal: bool,
    pub uv1: bool,
    pub uv2: bool,
    pub vertex_color: bool,
    pub vertex_alpha: bool,
    pub num_bone_influencers: u32,
    pub bones_per_mesh: u32,
    pub instances: bool,
}

impl FeatureFlags {
    /// Builds the define set. Booleans appear only when enabled, integer
    /// defines are always present, so the mapping is injective.
    #[must_use]
    pub fn to_defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::with_capacity(24);

        defines.set_flag("DIFFUSE", self.diffuse);
        defines.set_int("DIFFUSEDIRECTUV", self.diffuse_direct_uv);
        defines.set_flag("BUMP", self.bump);
        defines.set_int("BUMPDIRECTUV", self.bump_direct_uv);
        defines.set_flag("MAINUV1", self.main_uv1);
        defines.set_flag("MAINUV2", self.main_uv2);
        defines.set_flag("ALPHAFROMDIFFUSE", self.alpha_from_diffuse);

        defines.set_flag("CLIPPLANE", self.clip_plane);
        defines.set_flag("ALPHATEST", self.alpha_test);
        defines.set_flag("POINTSIZE", self.point_size);
        defines.set_flag("FOG", self.fog);

        for index in 0..self.light_count {
            defines.set_flag(&format!("LIGHT{index}"), true);
            if self.casts_shadow(index) {
                defines.set_flag(&format!("SHADOW{index}"), true);
            }
        }
        defines.set_flag("SHADOWS", self.effective_shadow_mask() != 0);
        defines.set_flag("SPECULARTERM", self.specular_term);

        defines.set_flag("NORMAL", self.normal);
        defines.set_flag("UV1", self.uv1);
        defines.set_flag("UV2", self.uv2);
        defines.set_flag("VERTEXCOLOR", self.vertex_color);
        defines.set_flag("VERTEXALPHA", self.vertex_alpha);
        defines.set_int("NUM_BONE_INFLUENCERS", self.num_bone_influencers);
        defines.set_int("BonesPerMesh", self.bones_per_mesh);
        defines.set_flag("INSTANCES", self.instances);

        defines
    }

    #[must_use]
    pub fn casts_shadow(&self, light_index: u32) -> bool {
        light_index < 32 && self.effective_shadow_mask() & (1 << light_index) != 0
    }

    /// `shadow_mask` restricted to the active light slots.
    #[must_use]
    pub fn effective_shadow_mask(&self) -> u32 {
        self.shadow_mask & slot_mask(self.light_count)
    }

    fn canonical(&self) -> CanonicalFlags {
        let Self {
            diffuse,
            diffuse_direct_uv,
            bump,
            bump_direct_uv,
            main_uv1,
            main_uv2,
            alpha_from_diffuse,
            clip_plane,
            alpha_test,
            point_size,
            fog,
            light_count,
            shadow_mask: _,
            specular_term,
            normal,
            uv1,
            uv2,
            vertex_color,
            vertex_alpha,
            num_bone_influencers,
            bones_per_mesh,
            instances,
        } = *self;

        (
            (diffuse, diffuse_direct_uv, bump, bump_direct_uv, main_uv1, main_uv2, alpha_from_diffuse),
            (clip_plane, alpha_test, point_size, fog),
            (light_count, self.effective_shadow_mask(), specular_term),
            (normal, uv1, uv2, vertex_color, vertex_alpha, num_bone_influencers, bones_per_mesh, instances),
        )
    }

    #[must_use]
    pub fn variant_key(&self) -> VariantKey {
        VariantKey::from_defines(&self.to_defines())
    }
}

type CanonicalFlags = (
    (bool, u32, bool, u32, bool, bool, bool),
    (bool, bool, bool, bool),
    (u32, u32, bool),
    (bool, bool, bool, bool, bool, u32, u32, bool),
);

/// Low `light_count` bits set.
#[must_use]
pub fn slot_mask(light_count: u32) -> u32 {
    1u32.checked_shl(light_count).map_or(u32::MAX, |bit| bit - 1)
}

impl PartialEq for FeatureFlags {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for FeatureFlags {}

impl Hash for FeatureFlags {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

/// Canonical, process-independent identity of a define set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    text: String,
    hash: u64,
}

impl VariantKey {
    #[must_use]
    pub fn from_defines(defines: &ShaderDefines) -> Self {
        let text = defines.canonical_text();
        let hash = xxh3_64(text.as_bytes());
        Self { text, hash }
    }

    /// Sorted `NAME=value` pairs joined with `;`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Stable 64-bit xxh3 hash of the canonical text.
    #[must_use]
    pub fn hash64(&self) -> u64 {
        self.hash
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flags_only_carry_integer_defines() {
        let key = FeatureFlags::default().variant_key();
        assert_eq!(
            key.as_str(),
            "BUMPDIRECTUV=0;BonesPerMesh=0;DIFFUSEDIRECTUV=0;NUM_BONE_INFLUENCERS=0"
        );
    }

    #[test]
    fn light_slots_expand_to_indexed_defines() {
        let flags = FeatureFlags {
            light_count: 2,
            shadow_mask: 0b10,
            ..FeatureFlags::default()
        };
        let defines = flags.to_defines();

        assert!(defines.contains("LIGHT0"));
        assert!(defines.contains("LIGHT1"));
        assert!(!defines.contains("SHADOW0"));
        assert!(defines.contains("SHADOW1"));
        assert!(defines.contains("SHADOWS"));
    }

    #[test]
    fn shadow_bits_past_light_count_are_ignored() {
        let one_light = |shadow_mask| FeatureFlags {
            light_count: 1,
            shadow_mask,
            ..FeatureFlags::default()
        };

        assert_eq!(one_light(0b10), one_light(0b100));
        assert_eq!(one_light(0b10), one_light(0));
        assert_eq!(one_light(0b10).variant_key(), one_light(0).variant_key());
        assert!(!one_light(0b10).to_defines().contains("SHADOWS"));
        assert!(!one_light(0b10).casts_shadow(1));

        assert_ne!(one_light(0b1), one_light(0));
        assert_ne!(one_light(0b1).variant_key(), one_light(0).variant_key());
        assert!(one_light(0b11).to_defines().contains("SHADOWS"));
    }

    #[test]
    fn equal_flags_hash_equally() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(FeatureFlags {
            light_count: 2,
            shadow_mask: 0b1101,
            ..FeatureFlags::default()
        });
        assert!(set.contains(&FeatureFlags {
            light_count: 2,
            shadow_mask: 0b01,
            ..FeatureFlags::default()
        }));
    }

    #[test]
    fn slot_mask_covers_active_lights() {
        assert_eq!(slot_mask(0), 0);
        assert_eq!(slot_mask(3), 0b111);
        assert_eq!(slot_mask(32), u32::MAX);
        assert_eq!(slot_mask(40), u32::MAX);
    }

    #[test]
    fn key_matches_manually_built_defines() {
        let flags = FeatureFlags {
            diffuse: true,
            uv1: true,
            ..FeatureFlags::default()
        };

        let mut manual = ShaderDefines::new();
        manual.set("UV1", "1");
        manual.set_int("NUM_BONE_INFLUENCERS", 0);
        manual.set_int("BonesPerMesh", 0);
        manual.set_int("BUMPDIRECTUV", 0);
        manual.set("DIFFUSE", "1");
        manual.set_int("DIFFUSEDIRECTUV", 0);

        assert_eq!(flags.variant_key(), VariantKey::from_defines(&manual));
    }

    #[test]
    fn display_is_hex_hash() {
        let key = FeatureFlags::default().variant_key();
        assert_eq!(key.to_string().len(), 16);
    }
}
