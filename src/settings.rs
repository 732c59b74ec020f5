//! Resolver Configuration
//!
//! Global switches that apply to every layer material in a host, mirroring
//! the engine-wide texture channel toggles of the standard material.
//!
//! ```rust,ignore
//! use layer_material::settings::ResolverConfig;
//!
//! // Defaults: every channel enabled, render-id short circuit active.
//! let config = ResolverConfig::default();
//!
//! // Partial JSON is fine; missing fields keep their defaults.
//! let config = ResolverConfig::from_json_str(r#"{ "bump_texture_enabled": false }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::renderer::cache_slot::DirtyCategories;

/// Engine-wide configuration consumed by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Global switch for the diffuse texture channel.
    pub diffuse_texture_enabled: bool,
    /// Global switch for the bump texture channel.
    pub bump_texture_enabled: bool,
    /// Disable the per-pass render-id short circuit and re-derive flags on
    /// every call. Useful while debugging staleness issues.
    pub check_ready_on_every_call: bool,
    /// Light budget given to newly created materials.
    pub default_max_simultaneous_lights: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            diffuse_texture_enabled: true,
            bump_texture_enabled: true,
            check_ready_on_every_call: false,
            default_max_simultaneous_lights: 4,
        }
    }
}

impl ResolverConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Define categories affected by the differences from `previous`. Only
    /// the texture channel switches feed defines.
    #[must_use]
    pub fn dirty_categories(&self, previous: Option<&Self>) -> DirtyCategories {
        let Some(prev) = previous else {
            return DirtyCategories::all();
        };

        if self.diffuse_texture_enabled != prev.diffuse_texture_enabled
            || self.bump_texture_enabled != prev.bump_texture_enabled
        {
            DirtyCategories::TEXTURES
        } else {
            DirtyCategories::empty()
        }
    }
}
