//! Compile fallbacks
//!
//! When the host cannot compile a variant (driver limits, too many
//! samplers...), it can retry with a simpler one. Fallbacks group defines by
//! rank; each [`Fallbacks::reduce`] call strips the lowest remaining rank.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::resources::ShaderDefines;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fallbacks {
    ranks: BTreeMap<u32, SmallVec<[String; 4]>>,
    cpu_skinning_rank: Option<u32>,
    cpu_skinning_forced: bool,
}

impl Fallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_fallback(&mut self, rank: u32, define: impl Into<String>) {
        self.ranks.entry(rank).or_default().push(define.into());
    }

    /// Registers switching the mesh to CPU skinning at `rank`.
    pub fn add_cpu_skinning_fallback(&mut self, rank: u32) {
        self.cpu_skinning_rank = Some(rank);
        self.ranks.entry(rank).or_default();
    }

    #[must_use]
    pub fn has_more_fallbacks(&self) -> bool {
        !self.ranks.is_empty()
    }

    /// The last reduction asked the host to skin on the CPU.
    #[must_use]
    pub fn cpu_skinning_forced(&self) -> bool {
        self.cpu_skinning_forced
    }

    /// Defines registered at `rank`.
    #[must_use]
    pub fn defines_at(&self, rank: u32) -> &[String] {
        self.ranks.get(&rank).map_or(&[][..], |d| d.as_slice())
    }

    /// Removes the lowest remaining rank from `defines`. Returns `false`
    /// when there is nothing left to fall back to.
    pub fn reduce(&mut self, defines: &mut ShaderDefines) -> bool {
        let Some((rank, names)) = self.ranks.pop_first() else {
            return false;
        };

        for name in &names {
            defines.remove(name);
        }

        if self.cpu_skinning_rank == Some(rank) {
            defines.set_int("NUM_BONE_INFLUENCERS", 0);
            self.cpu_skinning_forced = true;
            self.cpu_skinning_rank = None;
        }

        log::debug!("Shader fallback rank {rank} applied: {names:?}");
        true
    }
}
