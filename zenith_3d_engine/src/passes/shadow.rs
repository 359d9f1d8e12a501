/// Shadow pass: exponential shadow maps for the caster pool.
///
/// The atlas is a single-channel float texture array with one layer per
/// caster slot. Each live caster gets its light-space matrices
/// recomputed only when they can have changed, and renders the static
/// and animated indirect tables into its layer.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::draw::IndirectDrawTable;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Buffer, Texture, TextureDesc, TextureFormat, TextureUsage, Pipeline,
    PipelineDesc, VertexInput, CullMode, BindingGroup, BindingResource, CommandList,
    Attachment, LoadOp, ClearValue,
};
use crate::scene::{Scene, Light, LightKey, LightKind};
use crate::sync::{GpuArray, GpuShadowMatrices, SceneSynchronizer, StagedUploader};
use crate::engine_trace;
use super::{begin_pass, GeometryBuffers, ALL_STAGES};

/// Near plane of spot and point light projections
const SHADOW_NEAR: f32 = 0.05;

/// Cube face view directions and up vectors (+X, -X, +Y, -Y, +Z, -Z)
const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowPushConstants {
    /// Index into the shadow matrix array
    pub caster_slot: u32,
    /// Cube face (0 for directional and spot lights)
    pub face: u32,
    pub esm_exponent: f32,
    pub _pad: u32,
}

/// Up vector that is never parallel to `direction`
fn up_for(direction: Vec3) -> Vec3 {
    if direction.dot(Vec3::Y).abs() > 0.99 { Vec3::Z } else { Vec3::Y }
}

/// Orthographic light matrix enclosing the camera frustum corners
pub fn directional_matrix(direction: Vec3, corners: &[Vec3; 8]) -> Mat4 {
    let direction = direction.normalize_or(Vec3::NEG_Y);
    let center = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;
    let radius = corners.iter()
        .map(|c| c.distance(center))
        .fold(0.0f32, f32::max)
        .max(SHADOW_NEAR);

    let eye = center - direction * radius;
    let view = Mat4::look_at_rh(eye, center, up_for(direction));

    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(f32::MIN);
    for corner in corners {
        let light_space = view.transform_point3(*corner);
        min = min.min(light_space);
        max = max.max(light_space);
    }
    // Looking down -Z: extend the near side by the radius to catch
    // occluders between the light and the frustum.
    let projection = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max.z - radius, -min.z);
    projection * view
}

/// Perspective light matrix covering a spot cone
pub fn spot_matrix(position: Vec3, direction: Vec3, outer_angle: f32, range: f32) -> Mat4 {
    let direction = direction.normalize_or(Vec3::NEG_Z);
    let view = Mat4::look_at_rh(position, position + direction, up_for(direction));
    let fov = (outer_angle * 2.0).clamp(0.01, std::f32::consts::PI - 0.01);
    let projection = Mat4::perspective_rh(fov, 1.0, SHADOW_NEAR, range.max(SHADOW_NEAR * 2.0));
    projection * view
}

/// Six 90-degree cube-face matrices around a point light
pub fn point_matrices(position: Vec3, range: f32) -> [Mat4; 6] {
    let projection = Mat4::perspective_rh(FRAC_PI_2, 1.0, SHADOW_NEAR, range.max(SHADOW_NEAR * 2.0));
    CUBE_FACES.map(|(forward, up)| projection * Mat4::look_at_rh(position, position + forward, up))
}

/// Matrices last uploaded for one caster slot
struct CachedCaster {
    light: LightKey,
    computed_at: u64,
    /// Camera the matrices were fitted to (directional lights only)
    camera_view_projection: Option<Mat4>,
}

pub struct ShadowPass {
    atlas: Arc<dyn Texture>,
    depth: Arc<dyn Texture>,
    matrices: GpuArray,
    static_pipeline: Arc<dyn Pipeline>,
    skinned_pipeline: Arc<dyn Pipeline>,
    static_group: Arc<dyn BindingGroup>,
    animated_group: Arc<dyn BindingGroup>,
    cache: Vec<Option<CachedCaster>>,
    esm_exponent: f32,
}

fn shadow_pipeline(device: &dyn GraphicsDevice, program: &str, vertex_input: VertexInput) -> Result<Arc<dyn Pipeline>> {
    device.create_pipeline(PipelineDesc {
        program: program.to_string(),
        vertex_input,
        color_formats: vec![TextureFormat::R32_SFLOAT],
        depth_format: Some(TextureFormat::D32_FLOAT),
        depth_test: true,
        cull_mode: CullMode::Front,
        push_constant_size: std::mem::size_of::<ShadowPushConstants>() as u32,
    })
}

impl ShadowPass {
    pub fn new(device: &dyn GraphicsDevice, config: &EngineConfig, sync: &SceneSynchronizer) -> Result<Self> {
        let casters = config.capacities.shadow_casters;
        let resolution = config.shadow_atlas_resolution;
        let atlas = device.create_texture(TextureDesc {
            label: "shadow_atlas".to_string(),
            width: resolution,
            height: resolution,
            format: TextureFormat::R32_SFLOAT,
            usage: TextureUsage::SampledAndRenderTarget,
            mip_levels: 1,
            array_layers: casters,
        })?;
        let depth = device.create_texture(TextureDesc {
            label: "shadow_depth".to_string(),
            width: resolution,
            height: resolution,
            format: TextureFormat::D32_FLOAT,
            usage: TextureUsage::DepthStencil,
            mip_levels: 1,
            array_layers: 1,
        })?;
        let matrices = GpuArray::of::<GpuShadowMatrices>(device, "shadow_matrices", casters)?;

        let static_pipeline = shadow_pipeline(device, "shadow_static", VertexInput::Mesh)?;
        let skinned_pipeline = shadow_pipeline(device, "shadow_skinned", VertexInput::SkinnedMesh)?;
        let static_group = device.create_binding_group(&static_pipeline, 0, &[
            BindingResource::StorageBuffer(matrices.buffer().as_ref()),
            BindingResource::StorageBuffer(sync.static_array().buffer().as_ref()),
        ])?;
        let animated_group = device.create_binding_group(&skinned_pipeline, 0, &[
            BindingResource::StorageBuffer(matrices.buffer().as_ref()),
            BindingResource::StorageBuffer(sync.animated_array().buffer().as_ref()),
            BindingResource::StorageBuffer(sync.bone_array().buffer().as_ref()),
        ])?;

        Ok(Self {
            atlas,
            depth,
            matrices,
            static_pipeline,
            skinned_pipeline,
            static_group,
            animated_group,
            cache: (0..casters).map(|_| None).collect(),
            esm_exponent: config.esm_exponent,
        })
    }

    /// Light-space matrices for `light` (one for directional/spot, six for point)
    fn light_matrices(scene: &Scene, light: &Light, camera: &Camera) -> Vec<Mat4> {
        let position = scene.light_position(light);
        let direction = scene.light_direction(light);
        match light.kind {
            LightKind::Directional => vec![directional_matrix(direction, &camera.frustum_corners())],
            LightKind::Spot { range, outer_angle, .. } => vec![spot_matrix(position, direction, outer_angle, range)],
            LightKind::Point { range } => point_matrices(position, range).to_vec(),
        }
    }

    /// Recompute and stage the matrices of every caster whose light,
    /// light node, slot assignment or (directional) camera changed.
    ///
    /// Returns the number of casters recomputed.
    pub fn prepare(
        &mut self,
        scene: &Scene,
        sync: &SceneSynchronizer,
        camera: &Camera,
        uploader: &mut StagedUploader,
    ) -> Result<u32> {
        let casters = sync.casters();
        for (slot, cached) in self.cache.iter_mut().enumerate() {
            if casters.key_at(slot as u32).is_none() {
                *cached = None;
            }
        }

        let camera_view_projection = camera.view_projection_matrix();
        let mut recomputed = 0;
        for (slot, key) in casters.iter() {
            let Some(light) = scene.light(key) else { continue };
            let stamp = light.changed_at().max(scene.node_moved_at(light.node));
            let directional = matches!(light.kind, LightKind::Directional);

            let stale = match &self.cache[slot as usize] {
                None => true,
                Some(cached) => cached.light != key
                    || stamp > cached.computed_at
                    || (directional && cached.camera_view_projection != Some(camera_view_projection)),
            };
            if !stale {
                continue;
            }

            let matrices = Self::light_matrices(scene, light, camera);
            self.matrices.stage(uploader, slot, &GpuShadowMatrices::new(&matrices, self.esm_exponent))?;
            self.cache[slot as usize] = Some(CachedCaster {
                light: key,
                computed_at: scene.frame(),
                camera_view_projection: directional.then_some(camera_view_projection),
            });
            recomputed += 1;
        }
        if recomputed > 0 {
            engine_trace!("zenith3d::Shadow", "Recomputed {} caster matrices", recomputed);
        }
        Ok(recomputed)
    }

    /// Drop every cached caster so the next `prepare` restages them all
    pub fn invalidate(&mut self) {
        self.cache.iter_mut().for_each(|cached| *cached = None);
    }

    /// Render every live caster into its atlas layer.
    ///
    /// Returns the number of caster passes recorded (zero casters records
    /// nothing at all).
    pub fn render(
        &self,
        cmd: &mut dyn CommandList,
        sync: &SceneSynchronizer,
        static_table: &IndirectDrawTable,
        animated_table: &IndirectDrawTable,
        geometry: &GeometryBuffers,
    ) -> Result<u32> {
        let mut passes = 0;
        for (slot, _) in sync.casters().iter() {
            // Warped depth is exp(c * (d - 1)), so the far plane stores 1.0
            let color = Attachment::layer(&self.atlas, slot, LoadOp::Clear(ClearValue::Color([1.0; 4])));
            let depth = Attachment::new(&self.depth, LoadOp::Clear(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }));
            begin_pass(cmd, "shadow", vec![color], Some(depth))?;

            let push = ShadowPushConstants {
                caster_slot: slot,
                face: 0,
                esm_exponent: self.esm_exponent,
                _pad: 0,
            };
            if !static_table.is_empty() {
                cmd.bind_pipeline(&self.static_pipeline)?;
                cmd.bind_binding_group(&self.static_pipeline, 0, &self.static_group)?;
                cmd.push_constants(ALL_STAGES, 0, bytemuck::bytes_of(&push))?;
                geometry.draw_table(cmd, static_table, false)?;
            }
            if !animated_table.is_empty() {
                cmd.bind_pipeline(&self.skinned_pipeline)?;
                cmd.bind_binding_group(&self.skinned_pipeline, 0, &self.animated_group)?;
                cmd.push_constants(ALL_STAGES, 0, bytemuck::bytes_of(&push))?;
                geometry.draw_table(cmd, animated_table, true)?;
            }
            cmd.end_render_pass()?;
            passes += 1;
        }
        Ok(passes)
    }

    pub fn atlas(&self) -> &Arc<dyn Texture> {
        &self.atlas
    }

    pub fn matrix_buffer(&self) -> &Arc<dyn Buffer> {
        self.matrices.buffer()
    }

    pub fn esm_exponent(&self) -> f32 {
        self.esm_exponent
    }
}

#[cfg(test)]
#[path = "shadow_tests.rs"]
mod tests;
