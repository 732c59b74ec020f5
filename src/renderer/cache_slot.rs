//! Per-drawable variant cache
//!
//! Each drawable owns one [`CacheSlot`]. The slot remembers the variant the
//! drawable was last rendered with and the state that variant was resolved
//! against, so the resolver can tell a stale variant from a valid one.
//!
//! The program handle, its flags and its key live together in one
//! [`CommittedVariant`] and are only ever replaced as a whole.

use bitflags::bitflags;

use crate::material::defines::{FeatureFlags, VariantKey};
use crate::material::LayerMaterialSettings;
use crate::renderer::drawable::DrawableState;
use crate::renderer::program::ProgramHandle;
use crate::settings::ResolverConfig;

bitflags! {
    /// Define categories whose inputs changed since the last resolution.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyCategories: u8 {
        const TEXTURES   = 1 << 0;
        const MISC       = 1 << 1;
        const LIGHTS     = 1 << 2;
        const ATTRIBUTES = 1 << 3;
    }
}

/// A ready program together with the variant it was compiled for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedVariant {
    pub program: ProgramHandle,
    pub flags: FeatureFlags,
    pub key: VariantKey,
}

#[derive(Debug, Clone, Default)]
pub struct CacheSlot {
    committed: Option<CommittedVariant>,
    render_id: Option<u64>,
    dirty: DirtyCategories,
    settings_snapshot: Option<LayerMaterialSettings>,
    config_snapshot: Option<ResolverConfig>,
    drawable_snapshot: Option<DrawableState>,
    recompute_count: u64,
    // (program, material version) of the last uniform upload
    bound: Option<(ProgramHandle, u64)>,
}

impl CacheSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn committed(&self) -> Option<&CommittedVariant> {
        self.committed.as_ref()
    }

    #[must_use]
    pub fn program(&self) -> Option<ProgramHandle> {
        self.committed.as_ref().map(|c| c.program)
    }

    #[must_use]
    pub fn flags(&self) -> Option<&FeatureFlags> {
        self.committed.as_ref().map(|c| &c.flags)
    }

    #[must_use]
    pub fn key(&self) -> Option<&VariantKey> {
        self.committed.as_ref().map(|c| &c.key)
    }

    /// The slot holds a program confirmed ready by the host.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.committed.is_some()
    }

    #[must_use]
    pub fn render_id(&self) -> Option<u64> {
        self.render_id
    }

    /// Categories that forced the most recent flag recomputation.
    #[must_use]
    pub fn dirty(&self) -> DirtyCategories {
        self.dirty
    }

    /// Number of times the flags were recomputed for this drawable.
    #[must_use]
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    /// Replaces the committed variant, render id and snapshots in one step.
    /// Call only once the host reports `program` as ready.
    pub fn commit(
        &mut self,
        program: ProgramHandle,
        key: VariantKey,
        flags: FeatureFlags,
        render_id: u64,
        settings: &LayerMaterialSettings,
        config: &ResolverConfig,
        drawable: &DrawableState,
    ) {
        self.dirty = self.dirty_against(settings, config, drawable);
        self.committed = Some(CommittedVariant {
            program,
            flags,
            key,
        });
        self.render_id = Some(render_id);
        self.settings_snapshot = Some(settings.clone());
        self.config_snapshot = Some(*config);
        self.drawable_snapshot = Some(*drawable);
        self.bound = None;
    }

    /// Drops every cached decision. The next resolution starts from scratch.
    pub fn invalidate(&mut self) {
        *self = Self {
            recompute_count: self.recompute_count,
            ..Self::default()
        };
    }

    pub(crate) fn dirty_against(
        &self,
        settings: &LayerMaterialSettings,
        config: &ResolverConfig,
        drawable: &DrawableState,
    ) -> DirtyCategories {
        settings.dirty_categories(self.settings_snapshot.as_ref())
            | config.dirty_categories(self.config_snapshot.as_ref())
            | drawable.dirty_categories(self.drawable_snapshot.as_ref())
    }

    pub(crate) fn note_recompute(&mut self) {
        self.recompute_count += 1;
    }

    /// Recomputed flags matched the committed variant: only the pass stamp
    /// and snapshots move forward.
    pub(crate) fn refresh(
        &mut self,
        render_id: u64,
        dirty: DirtyCategories,
        settings: &LayerMaterialSettings,
        config: &ResolverConfig,
        drawable: &DrawableState,
    ) {
        self.dirty = dirty;
        self.render_id = Some(render_id);
        self.settings_snapshot = Some(settings.clone());
        self.config_snapshot = Some(*config);
        self.drawable_snapshot = Some(*drawable);
    }

    pub(crate) fn needs_rebind(&self, program: ProgramHandle, material_version: u64) -> bool {
        self.bound != Some((program, material_version))
    }

    pub(crate) fn mark_bound(&mut self, program: ProgramHandle, material_version: u64) {
        self.bound = Some((program, material_version));
    }
}

#[cfg(test)]
mod tests {
    use slotmap::KeyData;

    use super::*;

    fn handle(n: u64) -> ProgramHandle {
        ProgramHandle::from(KeyData::from_ffi(n))
    }

    #[test]
    fn fresh_slot_is_empty() {
        let slot = CacheSlot::new();
        assert!(!slot.is_ready());
        assert!(slot.render_id().is_none());
        assert_eq!(slot.recompute_count(), 0);
    }

    #[test]
    fn commit_stores_variant_as_one_value() {
        let mut slot = CacheSlot::new();
        let flags = FeatureFlags {
            diffuse: true,
            ..FeatureFlags::default()
        };
        let key = flags.variant_key();

        slot.commit(
            handle(1),
            key.clone(),
            flags,
            3,
            &LayerMaterialSettings::default(),
            &ResolverConfig::default(),
            &DrawableState::default(),
        );

        let committed = slot.committed().unwrap();
        assert_eq!(committed.flags, flags);
        assert_eq!(committed.key, key);
        assert_eq!(slot.render_id(), Some(3));
        assert_eq!(slot.dirty(), DirtyCategories::all());
    }

    #[test]
    fn config_switch_dirties_textures() {
        let mut slot = CacheSlot::new();
        let settings = LayerMaterialSettings::default();
        let drawable = DrawableState::default();
        let config = ResolverConfig::default();
        let flags = FeatureFlags::default();
        slot.commit(handle(1), flags.variant_key(), flags, 1, &settings, &config, &drawable);

        assert!(slot.dirty_against(&settings, &config, &drawable).is_empty());
        let no_diffuse = ResolverConfig {
            diffuse_texture_enabled: false,
            ..config
        };
        assert_eq!(
            slot.dirty_against(&settings, &no_diffuse, &drawable),
            DirtyCategories::TEXTURES
        );
    }

    #[test]
    fn invalidate_keeps_counter_only() {
        let mut slot = CacheSlot::new();
        slot.note_recompute();
        let flags = FeatureFlags::default();
        slot.commit(
            handle(1),
            flags.variant_key(),
            flags,
            1,
            &LayerMaterialSettings::default(),
            &ResolverConfig::default(),
            &DrawableState::default(),
        );

        slot.invalidate();
        assert!(!slot.is_ready());
        assert!(slot.render_id().is_none());
        assert_eq!(slot.recompute_count(), 1);
    }
}
