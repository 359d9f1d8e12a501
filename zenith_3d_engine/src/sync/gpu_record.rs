/// GPU-side record layouts.
///
/// Every record is `#[repr(C)]` + `Pod` and sized to a multiple of 16 bytes
/// so arrays of them match std430 layout. Records live at
/// `slot * size_of::<Record>()` in their category's GPU array.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use crate::camera::Camera;
use crate::scene::{Light, LightKind, Terrain, Water};

/// `shadow_slot` value of a light without a shadow caster slot
pub const NO_SHADOW_SLOT: u32 = u32::MAX;

/// `bone_offset` value of a static instance
pub const NO_BONES: u32 = u32::MAX;

/// GpuInstance flags
pub const INSTANCE_FLAG_VISIBLE: u32 = 1 << 0;
pub const INSTANCE_FLAG_SKINNED: u32 = 1 << 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub range: f32,
    pub direction: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    pub kind: u32,
    pub cos_inner: f32,
    pub cos_outer: f32,
    pub shadow_slot: u32,
    pub flags: u32,
}

impl GpuLight {
    pub fn new(light: &Light, position: Vec3, direction: Vec3, shadow_slot: Option<u32>) -> Self {
        let (cos_inner, cos_outer) = match light.kind {
            LightKind::Spot { inner_angle, outer_angle, .. } => (inner_angle.cos(), outer_angle.cos()),
            _ => (1.0, 1.0),
        };
        let range = match light.kind {
            LightKind::Directional => 0.0,
            kind => kind.range(),
        };
        Self {
            position: position.to_array(),
            range,
            direction: direction.to_array(),
            intensity: light.intensity,
            color: light.color.to_array(),
            kind: light.kind.type_id(),
            cos_inner,
            cos_outer,
            shadow_slot: shadow_slot.unwrap_or(NO_SHADOW_SLOT),
            flags: light.flags.bits(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuInstance {
    pub world: [[f32; 4]; 4],
    /// Inverse-transpose of `world`
    pub normal_matrix: [[f32; 4]; 4],
    /// First bone matrix in the bone array, `NO_BONES` for static instances
    pub bone_offset: u32,
    pub flags: u32,
    pub _pad: [u32; 2],
}

impl GpuInstance {
    pub fn new(world: Mat4, visible: bool, bone_offset: Option<u32>) -> Self {
        let mut flags = 0;
        if visible {
            flags |= INSTANCE_FLAG_VISIBLE;
        }
        if bone_offset.is_some() {
            flags |= INSTANCE_FLAG_SKINNED;
        }
        Self {
            world: world.to_cols_array_2d(),
            normal_matrix: world.inverse().transpose().to_cols_array_2d(),
            bone_offset: bone_offset.unwrap_or(NO_BONES),
            flags,
            _pad: [0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuTerrain {
    pub origin: [f32; 3],
    pub block_size: f32,
    pub blocks_x: u32,
    pub blocks_z: u32,
    pub block_resolution: u32,
    pub height_scale: f32,
    pub materials: [u32; 4],
}

impl From<&Terrain> for GpuTerrain {
    fn from(terrain: &Terrain) -> Self {
        Self {
            origin: terrain.origin.to_array(),
            block_size: terrain.block_size,
            blocks_x: terrain.blocks_x,
            blocks_z: terrain.blocks_z,
            block_resolution: terrain.block_resolution,
            height_scale: terrain.height_scale,
            materials: terrain.materials.map(u32::from),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuWater {
    pub origin: [f32; 3],
    pub resolution: u32,
    pub extent: [f32; 2],
    pub wave_amplitude: f32,
    pub wave_frequency: f32,
    pub color: [f32; 4],
    pub wave_speed: f32,
    pub _pad: [u32; 3],
}

impl From<&Water> for GpuWater {
    fn from(water: &Water) -> Self {
        Self {
            origin: water.origin.to_array(),
            resolution: water.resolution,
            extent: water.extent.to_array(),
            wave_amplitude: water.wave_amplitude,
            wave_frequency: water.wave_frequency,
            color: water.color.to_array(),
            wave_speed: water.wave_speed,
            _pad: [0; 3],
        }
    }
}

/// Light-space view-projection matrices of one shadow caster
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuShadowMatrices {
    pub matrices: [[[f32; 4]; 4]; 6],
    /// 1 for directional/spot, 6 for point lights
    pub face_count: u32,
    pub esm_exponent: f32,
    pub _pad: [u32; 2],
}

impl GpuShadowMatrices {
    pub fn new(matrices: &[Mat4], esm_exponent: f32) -> Self {
        let mut packed = [[[0.0; 4]; 4]; 6];
        for (dst, m) in packed.iter_mut().zip(matrices) {
            *dst = m.to_cols_array_2d();
        }
        Self {
            matrices: packed,
            face_count: matrices.len().min(6) as u32,
            esm_exponent,
            _pad: [0; 2],
        }
    }
}

/// Per-frame camera block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuCamera {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    pub inverse_view_projection: [[f32; 4]; 4],
    pub frustum_planes: [[f32; 4]; 6],
    pub position: [f32; 3],
    pub time: f32,
}

impl GpuCamera {
    pub fn new(camera: &Camera, time: f32) -> Self {
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix().to_cols_array_2d(),
            view_projection: camera.view_projection_matrix().to_cols_array_2d(),
            inverse_view_projection: camera.inverse_view_projection_matrix().to_cols_array_2d(),
            frustum_planes: camera.frustum().planes.map(|p| p.to_array()),
            position: camera.position().to_array(),
            time,
        }
    }
}

#[cfg(test)]
#[path = "gpu_record_tests.rs"]
mod tests;
