//! Material definitions

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::Color;

use super::SOId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SOMaterialType {
    StandardRGBColor,
    TransparentRGBColor,
}

/// Serializable material description carried by every scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct SOMaterial {
    pub name: String,
    pub kind: SOMaterialType,
    pub rgb_color: Color,
}

impl SOMaterial {
    pub fn standard<S: Into<String>>(name: S, color: Color) -> SOMaterial {
        SOMaterial {
            name: name.into(),
            kind: SOMaterialType::StandardRGBColor,
            rgb_color: color,
        }
    }

    pub fn transparent<S: Into<String>>(name: S, color: Color) -> SOMaterial {
        SOMaterial {
            name: name.into(),
            kind: SOMaterialType::TransparentRGBColor,
            rgb_color: color,
        }
    }

    pub fn default_standard() -> SOMaterial {
        SOMaterial::standard("default", Color::grey())
    }

    pub fn default_mesh() -> SOMaterial {
        SOMaterial::standard("default_mesh", Color::rgb(0.8, 0.8, 0.8))
    }
}

impl Default for SOMaterial {
    fn default() -> Self {
        Self::default_standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

impl Default for AlphaMode {
    fn default() -> Self {
        AlphaMode::Opaque
    }
}

/// Renderable material resolved from an [`SOMaterial`] or pushed as a
/// temporary override.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: Color,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

lazy_static! {
    static ref DEFAULT_MATERIAL: Arc<Material> = Arc::new(Material::default());
}

impl Material {
    pub fn get_default() -> Arc<Material> {
        DEFAULT_MATERIAL.clone()
    }

    pub fn from_so_material(m: &SOMaterial) -> Material {
        match m.kind {
            SOMaterialType::StandardRGBColor => Material {
                name: Some(m.name.clone()),
                base_color_factor: m.rgb_color.with_alpha(1.0),
                ..Material::default()
            },
            SOMaterialType::TransparentRGBColor => Material {
                name: Some(m.name.clone()),
                base_color_factor: m.rgb_color,
                alpha_mode: AlphaMode::Blend,
                double_sided: true,
                ..Material::default()
            },
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.alpha_mode == AlphaMode::Blend
    }
}

impl Default for Material {
    fn default() -> Self {
        Material {
            name: None,
            base_color_factor: Color::white(),
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

/// Receives the effective material of each object during
/// [`Scene::pre_render`](super::Scene::pre_render).
pub trait MaterialSink {
    fn apply(&mut self, id: SOId, material: &Arc<Material>);
}

impl<F: FnMut(SOId, &Arc<Material>)> MaterialSink for F {
    fn apply(&mut self, id: SOId, material: &Arc<Material>) {
        self(id, material)
    }
}
