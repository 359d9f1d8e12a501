/// Deferred lighting pass.
///
/// One fullscreen triangle reads the G-buffer, the light array, the
/// shadow atlas with its matrices and the environment chain, and writes
/// the HDR "lit" target. It always runs: with zero lights the output is
/// ambient, environment and fog only.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::camera::Camera;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage, Pipeline,
    PipelineDesc, VertexInput, CullMode, BindingGroup, BindingResource, CommandList,
    Attachment, LoadOp, ClearValue,
};
use crate::scene::Scene;
use crate::sync::SceneSynchronizer;
use super::{begin_pass, draw_fullscreen, GBuffer, ShadowPass, EnvironmentUpdater};

pub const LIT_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightingPushConstants {
    pub inverse_view_projection: [[f32; 4]; 4],
    /// rgb = ambient colour, w = environment mip count
    pub ambient: [f32; 4],
    /// rgb = fog colour, w = density
    pub fog: [f32; 4],
    /// xyz = camera position, w = fog height falloff
    pub camera_position: [f32; 4],
    /// Live lights
    pub light_count: u32,
    /// Slots the shader scans (high-water mark of the light pool)
    pub light_slots: u32,
    pub esm_exponent: f32,
    pub _pad: u32,
}

impl LightingPushConstants {
    pub fn new(scene: &Scene, camera: &Camera, sync: &SceneSynchronizer, environment_mips: u32, esm_exponent: f32) -> Self {
        let ambient = scene.ambient();
        let fog = scene.fog();
        let position = camera.position();
        Self {
            inverse_view_projection: camera.inverse_view_projection_matrix().to_cols_array_2d(),
            ambient: [ambient.x, ambient.y, ambient.z, environment_mips as f32],
            fog: [fog.color.x, fog.color.y, fog.color.z, fog.density],
            camera_position: [position.x, position.y, position.z, fog.height_falloff],
            light_count: sync.lights().len(),
            light_slots: sync.lights().high_water_mark(),
            esm_exponent,
            _pad: 0,
        }
    }
}

pub struct LightingPass {
    lit: Arc<dyn Texture>,
    pipeline: Arc<dyn Pipeline>,
    group: Arc<dyn BindingGroup>,
}

impl LightingPass {
    pub fn new(
        device: &dyn GraphicsDevice,
        gbuffer: &GBuffer,
        sync: &SceneSynchronizer,
        shadow: &ShadowPass,
        environment: &EnvironmentUpdater,
    ) -> Result<Self> {
        let pipeline = device.create_pipeline(PipelineDesc {
            program: "deferred_lighting".to_string(),
            vertex_input: VertexInput::None,
            color_formats: vec![LIT_FORMAT],
            depth_format: None,
            depth_test: false,
            cull_mode: CullMode::None,
            push_constant_size: std::mem::size_of::<LightingPushConstants>() as u32,
        })?;
        let (lit, group) = Self::create_targets(device, &pipeline, gbuffer, sync, shadow, environment)?;
        Ok(Self { lit, pipeline, group })
    }

    fn create_targets(
        device: &dyn GraphicsDevice,
        pipeline: &Arc<dyn Pipeline>,
        gbuffer: &GBuffer,
        sync: &SceneSynchronizer,
        shadow: &ShadowPass,
        environment: &EnvironmentUpdater,
    ) -> Result<(Arc<dyn Texture>, Arc<dyn BindingGroup>)> {
        let (width, height) = gbuffer.size();
        let lit = device.create_texture(TextureDesc {
            label: "lit".to_string(),
            width,
            height,
            format: LIT_FORMAT,
            usage: TextureUsage::SampledAndRenderTarget,
            mip_levels: 1,
            array_layers: 1,
        })?;
        let group = device.create_binding_group(pipeline, 0, &[
            BindingResource::SampledTexture(gbuffer.depth.as_ref()),
            BindingResource::SampledTexture(gbuffer.albedo.as_ref()),
            BindingResource::SampledTexture(gbuffer.normal.as_ref()),
            BindingResource::SampledTexture(gbuffer.material.as_ref()),
            BindingResource::StorageBuffer(sync.light_array().buffer().as_ref()),
            BindingResource::SampledTexture(shadow.atlas().as_ref()),
            BindingResource::StorageBuffer(shadow.matrix_buffer().as_ref()),
            BindingResource::SampledTexture(environment.radiance().as_ref()),
        ])?;
        Ok((lit, group))
    }

    /// Recreate the lit target against a resized G-buffer
    pub fn resize(
        &mut self,
        device: &dyn GraphicsDevice,
        gbuffer: &GBuffer,
        sync: &SceneSynchronizer,
        shadow: &ShadowPass,
        environment: &EnvironmentUpdater,
    ) -> Result<()> {
        let (lit, group) = Self::create_targets(device, &self.pipeline, gbuffer, sync, shadow, environment)?;
        self.lit = lit;
        self.group = group;
        Ok(())
    }

    pub fn record(&self, cmd: &mut dyn CommandList, push: &LightingPushConstants) -> Result<()> {
        let target = Attachment::new(&self.lit, LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 1.0])));
        begin_pass(cmd, "lighting", vec![target], None)?;
        draw_fullscreen(cmd, &self.pipeline, &[&self.group], Some(bytemuck::bytes_of(push)))?;
        cmd.end_render_pass()
    }

    pub fn lit(&self) -> &Arc<dyn Texture> {
        &self.lit
    }
}

#[cfg(test)]
#[path = "lighting_tests.rs"]
mod tests;
