/// Geometry pass: fills the G-buffer (MRT).
///
/// Sub-passes, in order: static instances (indirect), animated instances
/// (indirect, skinned), terrain patches and water patches (one
/// procedural-grid draw per live slot, `first_instance` = slot).

use std::sync::Arc;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Buffer, Texture, TextureDesc, TextureFormat, TextureUsage, Pipeline,
    PipelineDesc, VertexInput, CullMode, BindingGroup, BindingResource, CommandList,
    Attachment, LoadOp, ClearValue, IndexType, DRAW_INDEXED_INDIRECT_STRIDE,
};
use crate::draw::IndirectDrawTable;
use crate::scene::Scene;
use crate::sync::{SceneSynchronizer, TextureRebind, TextureBinding};
use crate::{engine_debug, engine_trace};
use super::begin_pass;

/// Vertex and index buffers shared by every model.
///
/// Model subranges address these through `first_index` and
/// `vertex_offset`; they are owned by the asset side.
#[derive(Clone)]
pub struct GeometryBuffers {
    pub vertices: Arc<dyn Buffer>,
    pub skinned_vertices: Arc<dyn Buffer>,
    pub indices: Arc<dyn Buffer>,
    pub index_type: IndexType,
}

impl GeometryBuffers {
    /// Bind the shared buffers and issue one indirect draw covering `table`
    pub(crate) fn draw_table(
        &self,
        cmd: &mut dyn CommandList,
        table: &IndirectDrawTable,
        skinned: bool,
    ) -> Result<u32> {
        if table.is_empty() {
            return Ok(0);
        }
        let vertices = if skinned { &self.skinned_vertices } else { &self.vertices };
        cmd.bind_vertex_buffer(vertices, 0)?;
        cmd.bind_index_buffer(&self.indices, 0, self.index_type)?;
        cmd.draw_indexed_indirect(table.buffer(), 0, table.len(), DRAW_INDEXED_INDIRECT_STRIDE)?;
        Ok(table.len())
    }
}

pub const ALBEDO_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;
pub const NORMAL_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;
pub const MATERIAL_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;
pub const DEPTH_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;

/// G-buffer render targets
pub struct GBuffer {
    /// D32 depth
    pub depth: Arc<dyn Texture>,
    /// RGB albedo + alpha
    pub albedo: Arc<dyn Texture>,
    /// Encoded normal + height
    pub normal: Arc<dyn Texture>,
    /// Specular, roughness
    pub material: Arc<dyn Texture>,
}

impl GBuffer {
    pub fn new(device: &dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let target = |label: &str, format: TextureFormat, usage: TextureUsage| {
            device.create_texture(TextureDesc {
                label: label.to_string(),
                width,
                height,
                format,
                usage,
                mip_levels: 1,
                array_layers: 1,
            })
        };
        Ok(Self {
            depth: target("gbuffer_depth", DEPTH_FORMAT, TextureUsage::DepthStencil)?,
            albedo: target("gbuffer_albedo", ALBEDO_FORMAT, TextureUsage::SampledAndRenderTarget)?,
            normal: target("gbuffer_normal", NORMAL_FORMAT, TextureUsage::SampledAndRenderTarget)?,
            material: target("gbuffer_material", MATERIAL_FORMAT, TextureUsage::SampledAndRenderTarget)?,
        })
    }

    /// Color targets in attachment order
    pub fn color_targets(&self) -> [&Arc<dyn Texture>; 3] {
        [&self.albedo, &self.normal, &self.material]
    }

    pub fn size(&self) -> (u32, u32) {
        let info = self.depth.info();
        (info.width, info.height)
    }
}

/// Draws issued by one geometry pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeometryStats {
    pub static_draws: u32,
    pub animated_draws: u32,
    pub terrain_draws: u32,
    pub water_draws: u32,
}

impl GeometryStats {
    pub fn total(&self) -> u32 {
        self.static_draws + self.animated_draws + self.terrain_draws + self.water_draws
    }
}

pub struct GeometryPass {
    gbuffer: GBuffer,
    static_pipeline: Arc<dyn Pipeline>,
    skinned_pipeline: Arc<dyn Pipeline>,
    terrain_pipeline: Arc<dyn Pipeline>,
    water_pipeline: Arc<dyn Pipeline>,
    static_group: Arc<dyn BindingGroup>,
    animated_group: Arc<dyn BindingGroup>,
    terrain_group: Arc<dyn BindingGroup>,
    water_group: Arc<dyn BindingGroup>,
    /// Set 1 of the terrain pipeline: one blend map per terrain slot
    terrain_textures: Arc<dyn BindingGroup>,
    /// Set 1 of the water pipeline: one normal map per water slot
    water_textures: Arc<dyn BindingGroup>,
    fallback: Arc<dyn Texture>,
}

fn gbuffer_pipeline(device: &dyn GraphicsDevice, program: &str, vertex_input: VertexInput) -> Result<Arc<dyn Pipeline>> {
    device.create_pipeline(PipelineDesc {
        program: program.to_string(),
        vertex_input,
        color_formats: vec![ALBEDO_FORMAT, NORMAL_FORMAT, MATERIAL_FORMAT],
        depth_format: Some(DEPTH_FORMAT),
        depth_test: true,
        cull_mode: CullMode::Back,
        push_constant_size: 0,
    })
}

impl GeometryPass {
    /// Create the pass; every texture-array element starts bound to `fallback`.
    pub fn new(
        device: &dyn GraphicsDevice,
        config: &EngineConfig,
        camera: &Arc<dyn Buffer>,
        sync: &SceneSynchronizer,
        fallback: &Arc<dyn Texture>,
    ) -> Result<Self> {
        let static_pipeline = gbuffer_pipeline(device, "gbuffer_static", VertexInput::Mesh)?;
        let skinned_pipeline = gbuffer_pipeline(device, "gbuffer_skinned", VertexInput::SkinnedMesh)?;
        let terrain_pipeline = gbuffer_pipeline(device, "gbuffer_terrain", VertexInput::None)?;
        let water_pipeline = gbuffer_pipeline(device, "gbuffer_water", VertexInput::None)?;

        let static_group = device.create_binding_group(&static_pipeline, 0, &[
            BindingResource::UniformBuffer(camera.as_ref()),
            BindingResource::StorageBuffer(sync.static_array().buffer().as_ref()),
        ])?;
        let animated_group = device.create_binding_group(&skinned_pipeline, 0, &[
            BindingResource::UniformBuffer(camera.as_ref()),
            BindingResource::StorageBuffer(sync.animated_array().buffer().as_ref()),
            BindingResource::StorageBuffer(sync.bone_array().buffer().as_ref()),
        ])?;
        let terrain_group = device.create_binding_group(&terrain_pipeline, 0, &[
            BindingResource::UniformBuffer(camera.as_ref()),
            BindingResource::StorageBuffer(sync.terrain_array().buffer().as_ref()),
        ])?;
        let water_group = device.create_binding_group(&water_pipeline, 0, &[
            BindingResource::UniformBuffer(camera.as_ref()),
            BindingResource::StorageBuffer(sync.water_array().buffer().as_ref()),
        ])?;

        let terrain_slots = config.capacities.terrains;
        let water_slots = config.capacities.waters;
        let terrain_textures = device.create_binding_group(
            &terrain_pipeline, 1, &[BindingResource::TextureArray { count: terrain_slots }])?;
        let water_textures = device.create_binding_group(
            &water_pipeline, 1, &[BindingResource::TextureArray { count: water_slots }])?;
        for slot in 0..terrain_slots {
            device.write_texture_binding(&terrain_textures, 0, slot, fallback)?;
        }
        for slot in 0..water_slots {
            device.write_texture_binding(&water_textures, 0, slot, fallback)?;
        }

        Ok(Self {
            gbuffer: GBuffer::new(device, config.render_width, config.render_height)?,
            static_pipeline,
            skinned_pipeline,
            terrain_pipeline,
            water_pipeline,
            static_group,
            animated_group,
            terrain_group,
            water_group,
            terrain_textures,
            water_textures,
            fallback: Arc::clone(fallback),
        })
    }

    /// Recreate the G-buffer at a new size
    pub fn resize(&mut self, device: &dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        self.gbuffer = GBuffer::new(device, width, height)?;
        engine_debug!("zenith3d::GeometryPass", "G-buffer resized to {}x{}", width, height);
        Ok(())
    }

    /// Point terrain/water texture-array elements at their new textures
    pub fn apply_rebinds(&self, device: &dyn GraphicsDevice, rebinds: &[TextureRebind]) -> Result<()> {
        for rebind in rebinds {
            let group = match rebind.binding {
                TextureBinding::TerrainBlendMap => &self.terrain_textures,
                TextureBinding::WaterNormalMap => &self.water_textures,
            };
            let texture = rebind.texture.as_ref().unwrap_or(&self.fallback);
            device.write_texture_binding(group, 0, rebind.slot, texture)?;
        }
        Ok(())
    }

    /// Record the G-buffer pass.
    pub fn record(
        &self,
        cmd: &mut dyn CommandList,
        scene: &Scene,
        sync: &SceneSynchronizer,
        static_table: &IndirectDrawTable,
        animated_table: &IndirectDrawTable,
        geometry: &GeometryBuffers,
    ) -> Result<GeometryStats> {
        let clear = LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 0.0]));
        let colors = self.gbuffer.color_targets().iter()
            .map(|t| Attachment::new(t, clear))
            .collect();
        let depth = Attachment::new(
            &self.gbuffer.depth, LoadOp::Clear(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }));
        begin_pass(cmd, "geometry", colors, Some(depth))?;

        let mut stats = GeometryStats::default();

        if !static_table.is_empty() {
            cmd.bind_pipeline(&self.static_pipeline)?;
            cmd.bind_binding_group(&self.static_pipeline, 0, &self.static_group)?;
            stats.static_draws = geometry.draw_table(cmd, static_table, false)?;
        }
        if !animated_table.is_empty() {
            cmd.bind_pipeline(&self.skinned_pipeline)?;
            cmd.bind_binding_group(&self.skinned_pipeline, 0, &self.animated_group)?;
            stats.animated_draws = geometry.draw_table(cmd, animated_table, true)?;
        }

        if !sync.terrains().is_empty() {
            cmd.bind_pipeline(&self.terrain_pipeline)?;
            cmd.bind_binding_group(&self.terrain_pipeline, 0, &self.terrain_group)?;
            cmd.bind_binding_group(&self.terrain_pipeline, 1, &self.terrain_textures)?;
            for (slot, key) in sync.terrains().iter() {
                let Some(terrain) = scene.terrain(key) else { continue };
                cmd.draw(terrain.vertex_count(), 1, 0, slot)?;
                stats.terrain_draws += 1;
            }
        }

        if !sync.waters().is_empty() {
            cmd.bind_pipeline(&self.water_pipeline)?;
            cmd.bind_binding_group(&self.water_pipeline, 0, &self.water_group)?;
            cmd.bind_binding_group(&self.water_pipeline, 1, &self.water_textures)?;
            for (slot, key) in sync.waters().iter() {
                let Some(water) = scene.water(key) else { continue };
                cmd.draw(water.vertex_count(), 1, 0, slot)?;
                stats.water_draws += 1;
            }
        }

        cmd.end_render_pass()?;
        engine_trace!("zenith3d::GeometryPass", "{} draws ({:?})", stats.total(), stats);
        Ok(stats)
    }

    pub fn gbuffer(&self) -> &GBuffer {
        &self.gbuffer
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
