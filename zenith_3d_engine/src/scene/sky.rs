/// Sky description and global atmosphere parameters.

use std::sync::Arc;
use glam::Vec3;
use crate::graphics_device::Texture;

/// What the environment chain is generated from
#[derive(Clone, Default)]
pub enum SkyVariant {
    /// Black environment
    #[default]
    None,
    /// Uniform colour
    Flat { color: Vec3 },
    /// Analytic atmosphere lit by the sun light
    Procedural {
        turbidity: f32,
        sun_intensity: f32,
        rayleigh: f32,
        mie: f32,
    },
    /// Equirectangular HDR image
    Panorama { texture: Arc<dyn Texture> },
}

impl SkyVariant {
    pub fn name(&self) -> &'static str {
        match self {
            SkyVariant::None => "none",
            SkyVariant::Flat { .. } => "flat",
            SkyVariant::Procedural { .. } => "procedural",
            SkyVariant::Panorama { .. } => "panorama",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Vec3,
    /// 0 disables fog
    pub density: f32,
    pub height_falloff: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self { color: Vec3::splat(0.5), density: 0.0, height_falloff: 0.0 }
    }
}
