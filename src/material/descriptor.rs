//! Serialization codec
//!
//! [`LayerMaterialDescriptor`] is the plain, serde-friendly form of a layer
//! material. Textures are stored by name; the host resolves names back to
//! textures through a lookup closure when rebuilding the material.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::errors::{MaterialError, Result};
use crate::material::layer::{CLASS_NAME, LayerMaterial, LayerMaterialSettings};
use crate::resources::TextureRef;
use crate::settings::ResolverConfig;

/// Type tag written to `customType`. Loaders also accept the bare class name.
pub const CUSTOM_TYPE: &str = "BABYLON.LayerMaterial";

fn default_custom_type() -> String {
    CUSTOM_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerMaterialDescriptor {
    pub custom_type: String,
    pub name: String,
    pub id: Option<String>,
    pub diffuse_texture: Option<String>,
    pub bump_texture: Option<String>,
    #[serde(rename = "background")]
    pub background_color: [f32; 3],
    #[serde(rename = "specular")]
    pub specular_color: [f32; 3],
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

impl Default for LayerMaterialDescriptor {
    fn default() -> Self {
        let settings = LayerMaterialSettings::default();
        Self {
            custom_type: default_custom_type(),
            name: String::new(),
            id: None,
            diffuse_texture: None,
            bump_texture: None,
            background_color: settings.background_color.to_array(),
            specular_color: settings.specular_color.to_array(),
            specular_power: settings.specular_power,
            disable_lighting: settings.disable_lighting,
            max_simultaneous_lights: settings.max_simultaneous_lights,
            invert_normal_map_x: settings.invert_normal_map_x,
            invert_normal_map_y: settings.invert_normal_map_y,
            alpha: settings.alpha,
            fog_enabled: settings.fog_enabled,
            points_cloud: settings.points_cloud,
            point_size: settings.point_size,
        }
    }
}

impl LayerMaterial {
    #[must_use]
    pub fn to_descriptor(&self) -> LayerMaterialDescriptor {
        let s = &self.settings;
        let texture_name = |t: &Option<TextureRef>| t.as_ref().map(|t| t.name().to_string());

        LayerMaterialDescriptor {
            custom_type: default_custom_type(),
            name: self.name.clone(),
            id: Some(self.uuid.to_string()),
            diffuse_texture: texture_name(&s.diffuse_texture),
            bump_texture: texture_name(&s.bump_texture),
            background_color: s.background_color.to_array(),
            specular_color: s.specular_color.to_array(),
            specular_power: s.specular_power,
            disable_lighting: s.disable_lighting,
            max_simultaneous_lights: s.max_simultaneous_lights,
            invert_normal_map_x: s.invert_normal_map_x,
            invert_normal_map_y: s.invert_normal_map_y,
            alpha: s.alpha,
            fog_enabled: s.fog_enabled,
            points_cloud: s.points_cloud,
            point_size: s.point_size,
        }
    }

    /// Rebuilds a material. `texture_lookup` maps a serialized texture name
    /// to the host texture; a name it cannot resolve is an error.
    pub fn from_descriptor<F>(
        desc: &LayerMaterialDescriptor,
        config: ResolverConfig,
        mut texture_lookup: F,
    ) -> Result<Self>
    where
        F: FnMut(&str) -> Option<TextureRef>,
    {
        if desc.custom_type != CUSTOM_TYPE && desc.custom_type != CLASS_NAME {
            return Err(MaterialError::UnsupportedMaterialType(desc.custom_type.clone()));
        }

        let mut resolve_texture = |name: &Option<String>| -> Result<Option<TextureRef>> {
            match name {
                Some(name) => texture_lookup(name)
                    .map(Some)
                    .ok_or_else(|| MaterialError::UnknownTexture(name.clone())),
                None => Ok(None),
            }
        };
        let diffuse_texture = resolve_texture(&desc.diffuse_texture)?;
        let bump_texture = resolve_texture(&desc.bump_texture)?;

        let mut material = LayerMaterial::with_config(desc.name.clone(), config);
        if let Some(uuid) = desc.id.as_deref().and_then(|id| uuid::Uuid::parse_str(id).ok()) {
            material.uuid = uuid;
        }
        material.settings = LayerMaterialSettings {
            diffuse_texture,
            bump_texture,
            background_color: Vec3::from_array(desc.background_color),
            specular_color: Vec3::from_array(desc.specular_color),
            specular_power: desc.specular_power,
            disable_lighting: desc.disable_lighting,
            max_simultaneous_lights: desc.max_simultaneous_lights,
            invert_normal_map_x: desc.invert_normal_map_x,
            invert_normal_map_y: desc.invert_normal_map_y,
            alpha: desc.alpha,
            fog_enabled: desc.fog_enabled,
            points_cloud: desc.points_cloud,
            point_size: desc.point_size,
        };

        log::debug!("Loaded layer material '{}'", material.name);
        Ok(material)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_descriptor())?)
    }

    pub fn from_json<F>(json: &str, config: ResolverConfig, texture_lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<TextureRef>,
    {
        let desc: LayerMaterialDescriptor = serde_json::from_str(json)?;
        Self::from_descriptor(&desc, config, texture_lookup)
    }
}
