/// Water patches: an animated grid with a normal map.

use std::sync::Arc;
use glam::{Vec2, Vec3, Vec4};
use slotmap::new_key_type;
use crate::graphics_device::Texture;

new_key_type! {
    /// Stable key for a Water patch within a Scene.
    pub struct WaterKey;
}

#[derive(Clone)]
pub struct Water {
    pub origin: Vec3,
    pub extent: Vec2,
    /// Cells per grid edge
    pub resolution: u32,
    pub wave_amplitude: f32,
    pub wave_frequency: f32,
    pub wave_speed: f32,
    pub color: Vec4,
    normal_map: Option<Arc<dyn Texture>>,
    normal_map_changed: bool,
    pub(crate) changed_at: u64,
}

impl Water {
    pub fn new(origin: Vec3, extent: Vec2, resolution: u32) -> Self {
        Self {
            origin,
            extent,
            resolution,
            wave_amplitude: 0.2,
            wave_frequency: 1.0,
            wave_speed: 1.0,
            color: Vec4::new(0.1, 0.3, 0.4, 0.8),
            normal_map: None,
            normal_map_changed: false,
            changed_at: 0,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.resolution * self.resolution * 6
    }

    pub fn normal_map(&self) -> Option<&Arc<dyn Texture>> {
        self.normal_map.as_ref()
    }

    pub fn set_normal_map(&mut self, texture: Option<Arc<dyn Texture>>) {
        self.normal_map = texture;
        self.normal_map_changed = true;
    }

    pub fn normal_map_changed(&self) -> bool {
        self.normal_map_changed
    }

    pub(crate) fn take_normal_map_changed(&mut self) -> bool {
        std::mem::take(&mut self.normal_map_changed)
    }

    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }
}
