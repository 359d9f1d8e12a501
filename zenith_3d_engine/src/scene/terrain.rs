/// Terrain patches: a grid of blocks displaced by a height field.

use std::sync::Arc;
use glam::Vec3;
use slotmap::new_key_type;
use crate::graphics_device::Texture;

new_key_type! {
    /// Stable key for a Terrain within a Scene.
    pub struct TerrainKey;
}

#[derive(Clone)]
pub struct Terrain {
    pub origin: Vec3,
    pub blocks_x: u32,
    pub blocks_z: u32,
    /// Cells per block edge
    pub block_resolution: u32,
    /// World-space edge length of one block
    pub block_size: f32,
    pub height_scale: f32,
    /// Material slots blended by the blend map channels
    pub materials: [u16; 4],
    blend_map: Option<Arc<dyn Texture>>,
    blend_map_changed: bool,
    pub(crate) changed_at: u64,
}

impl Terrain {
    pub fn new(origin: Vec3, blocks_x: u32, blocks_z: u32, block_resolution: u32) -> Self {
        Self {
            origin,
            blocks_x,
            blocks_z,
            block_resolution,
            block_size: 32.0,
            height_scale: 1.0,
            materials: [0; 4],
            blend_map: None,
            blend_map_changed: false,
            changed_at: 0,
        }
    }

    /// Vertices generated for one draw: two triangles per cell
    pub fn vertex_count(&self) -> u32 {
        let cells = self.block_resolution * self.block_resolution;
        self.blocks_x * self.blocks_z * cells * 6
    }

    pub fn blend_map(&self) -> Option<&Arc<dyn Texture>> {
        self.blend_map.as_ref()
    }

    pub fn set_blend_map(&mut self, texture: Option<Arc<dyn Texture>>) {
        self.blend_map = texture;
        self.blend_map_changed = true;
    }

    pub fn blend_map_changed(&self) -> bool {
        self.blend_map_changed
    }

    pub(crate) fn take_blend_map_changed(&mut self) -> bool {
        std::mem::take(&mut self.blend_map_changed)
    }

    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }
}
