/// Environment updater: regenerates the image-based lighting chain.
///
/// The radiance texture is equirectangular (width = 2 x height) with one
/// mip per blur level. A scratch texture of the same shape holds the
/// downsample chain. When the scene's sky is dirty the updater walks
///
/// ```text
/// Clean -> RenderBase -> Downsample -> Convolve -> Clean
/// ```
///
/// in a single frame: the sky is rendered into radiance mip 0, scratch
/// mips 1..n are filled from the previous level, and radiance mip i is
/// convolved from scratch mip i with blur strength `i / (n - 1)`.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage, Pipeline, PipelineDesc,
    VertexInput, CullMode, BindingGroup, BindingResource, CommandList, Attachment, LoadOp,
    ClearValue, Barrier, ResourceState,
};
use crate::scene::{Scene, SkyVariant};
use crate::{engine_debug, engine_trace};
use super::{begin_pass, draw_fullscreen};

const RADIANCE_FORMAT: TextureFormat = TextureFormat::R16G16B16A16_SFLOAT;

/// Where the updater is in its regeneration sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentState {
    Clean,
    RenderBase,
    Downsample,
    Convolve,
}

/// Procedural sky parameters
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SkyPushConstants {
    /// xyz = direction towards the sun, w = sun intensity
    pub sun: [f32; 4],
    pub turbidity: f32,
    pub rayleigh: f32,
    pub mie: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ConvolvePushConstants {
    /// 0 = mirror, 1 = fully diffuse
    pub blur: f32,
    pub mip_level: u32,
    pub _pad: [u32; 2],
}

pub struct EnvironmentUpdater {
    radiance: Arc<dyn Texture>,
    scratch: Arc<dyn Texture>,
    mip_count: u32,
    state: EnvironmentState,
    procedural_pipeline: Arc<dyn Pipeline>,
    panorama_pipeline: Arc<dyn Pipeline>,
    downsample_pipeline: Arc<dyn Pipeline>,
    convolve_pipeline: Arc<dyn Pipeline>,
    /// `downsample_groups[i - 1]` samples the source of scratch mip i
    downsample_groups: Vec<Arc<dyn BindingGroup>>,
    /// `convolve_groups[i - 1]` samples scratch mip i
    convolve_groups: Vec<Arc<dyn BindingGroup>>,
    /// Binding group for the last panorama seen, keyed by its texture
    panorama: Option<(Arc<dyn Texture>, Arc<dyn BindingGroup>)>,
    regenerations: u64,
}

fn fullscreen_pipeline(device: &dyn GraphicsDevice, program: &str, push_constant_size: usize) -> Result<Arc<dyn Pipeline>> {
    device.create_pipeline(PipelineDesc {
        program: program.to_string(),
        vertex_input: VertexInput::None,
        color_formats: vec![RADIANCE_FORMAT],
        depth_format: None,
        depth_test: false,
        cull_mode: CullMode::None,
        push_constant_size: push_constant_size as u32,
    })
}

impl EnvironmentUpdater {
    pub fn new(device: &dyn GraphicsDevice, config: &EngineConfig) -> Result<Self> {
        let mip_count = config.environment_mip_count();
        let chain = |label: &str| TextureDesc {
            label: label.to_string(),
            width: config.environment_resolution * 2,
            height: config.environment_resolution,
            format: RADIANCE_FORMAT,
            usage: TextureUsage::SampledAndRenderTarget,
            mip_levels: mip_count,
            array_layers: 1,
        };
        let radiance = device.create_texture(chain("environment_radiance"))?;
        let scratch = device.create_texture(chain("environment_scratch"))?;

        let procedural_pipeline = fullscreen_pipeline(
            device, "sky_procedural", std::mem::size_of::<SkyPushConstants>())?;
        let panorama_pipeline = fullscreen_pipeline(device, "sky_panorama", 0)?;
        let downsample_pipeline = fullscreen_pipeline(device, "environment_downsample", 0)?;
        let convolve_pipeline = fullscreen_pipeline(
            device, "environment_convolve", std::mem::size_of::<ConvolvePushConstants>())?;

        let mut downsample_groups = Vec::new();
        let mut convolve_groups = Vec::new();
        for mip in 1..mip_count {
            let source = if mip == 1 {
                BindingResource::SampledTextureMip(radiance.as_ref(), 0)
            } else {
                BindingResource::SampledTextureMip(scratch.as_ref(), mip - 1)
            };
            downsample_groups.push(device.create_binding_group(&downsample_pipeline, 0, &[source])?);
            convolve_groups.push(device.create_binding_group(
                &convolve_pipeline, 0, &[BindingResource::SampledTextureMip(scratch.as_ref(), mip)])?);
        }

        engine_debug!("zenith3d::Environment",
            "Created {}x{} environment chain with {} mips",
            config.environment_resolution * 2, config.environment_resolution, mip_count);

        Ok(Self {
            radiance,
            scratch,
            mip_count,
            state: EnvironmentState::Clean,
            procedural_pipeline,
            panorama_pipeline,
            downsample_pipeline,
            convolve_pipeline,
            downsample_groups,
            convolve_groups,
            panorama: None,
            regenerations: 0,
        })
    }

    /// Regenerate the chain if the sky is dirty.
    ///
    /// Returns whether anything was recorded. Clears the sky dirty flag
    /// once the chain is complete.
    pub fn update(&mut self, device: &dyn GraphicsDevice, cmd: &mut dyn CommandList, scene: &mut Scene) -> Result<bool> {
        if !scene.is_sky_dirty() {
            return Ok(false);
        }
        self.state = EnvironmentState::RenderBase;
        while self.state != EnvironmentState::Clean {
            self.step(device, cmd, scene)?;
        }
        scene.clear_sky_dirty();
        self.regenerations += 1;
        engine_debug!("zenith3d::Environment",
            "Regenerated environment from '{}' sky", scene.sky().name());
        Ok(true)
    }

    /// Execute the current state and advance to the next one.
    fn step(&mut self, device: &dyn GraphicsDevice, cmd: &mut dyn CommandList, scene: &Scene) -> Result<()> {
        self.state = match self.state {
            EnvironmentState::Clean => EnvironmentState::Clean,
            EnvironmentState::RenderBase => {
                self.render_base(device, cmd, scene)?;
                EnvironmentState::Downsample
            }
            EnvironmentState::Downsample => {
                self.downsample(cmd)?;
                EnvironmentState::Convolve
            }
            EnvironmentState::Convolve => {
                self.convolve(cmd)?;
                EnvironmentState::Clean
            }
        };
        Ok(())
    }

    fn render_base(&mut self, device: &dyn GraphicsDevice, cmd: &mut dyn CommandList, scene: &Scene) -> Result<()> {
        cmd.barrier(&[Barrier::texture(&self.radiance, ResourceState::Undefined, ResourceState::RenderTarget)])?;

        let clear = match scene.sky() {
            SkyVariant::Flat { color } => [color.x, color.y, color.z, 1.0],
            _ => [0.0, 0.0, 0.0, 1.0],
        };
        let target = Attachment::mip(&self.radiance, 0, LoadOp::Clear(ClearValue::Color(clear)));
        begin_pass(cmd, "environment_base", vec![target], None)?;

        match scene.sky() {
            SkyVariant::None | SkyVariant::Flat { .. } => {}
            SkyVariant::Procedural { turbidity, sun_intensity, rayleigh, mie } => {
                let to_sun = -scene.sun_direction();
                let push = SkyPushConstants {
                    sun: [to_sun.x, to_sun.y, to_sun.z, *sun_intensity],
                    turbidity: *turbidity,
                    rayleigh: *rayleigh,
                    mie: *mie,
                    _pad: 0.0,
                };
                draw_fullscreen(cmd, &self.procedural_pipeline, &[], Some(bytemuck::bytes_of(&push)))?;
            }
            SkyVariant::Panorama { texture } => {
                let group = self.panorama_group(device, texture)?;
                draw_fullscreen(cmd, &self.panorama_pipeline, &[&group], None)?;
            }
        }
        cmd.end_render_pass()?;
        cmd.barrier(&[Barrier::texture(&self.radiance, ResourceState::RenderTarget, ResourceState::ShaderRead)])
    }

    fn panorama_group(&mut self, device: &dyn GraphicsDevice, texture: &Arc<dyn Texture>) -> Result<Arc<dyn BindingGroup>> {
        if let Some((cached, group)) = &self.panorama {
            if Arc::ptr_eq(cached, texture) {
                return Ok(Arc::clone(group));
            }
        }
        let group = device.create_binding_group(
            &self.panorama_pipeline, 0, &[BindingResource::SampledTexture(texture.as_ref())])?;
        self.panorama = Some((Arc::clone(texture), Arc::clone(&group)));
        Ok(group)
    }

    fn downsample(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.mip_count < 2 {
            return Ok(());
        }
        cmd.barrier(&[Barrier::texture(&self.scratch, ResourceState::Undefined, ResourceState::RenderTarget)])?;
        for mip in 1..self.mip_count {
            let target = Attachment::mip(&self.scratch, mip, LoadOp::DontCare);
            begin_pass(cmd, "environment_downsample", vec![target], None)?;
            draw_fullscreen(cmd, &self.downsample_pipeline, &[&self.downsample_groups[mip as usize - 1]], None)?;
            cmd.end_render_pass()?;
        }
        cmd.barrier(&[Barrier::texture(&self.scratch, ResourceState::RenderTarget, ResourceState::ShaderRead)])
    }

    fn convolve(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.mip_count < 2 {
            return Ok(());
        }
        cmd.barrier(&[Barrier::texture(&self.radiance, ResourceState::ShaderRead, ResourceState::RenderTarget)])?;
        for mip in 1..self.mip_count {
            let push = ConvolvePushConstants {
                blur: Self::blur_strength(mip, self.mip_count),
                mip_level: mip,
                _pad: [0; 2],
            };
            let target = Attachment::mip(&self.radiance, mip, LoadOp::DontCare);
            begin_pass(cmd, "environment_convolve", vec![target], None)?;
            draw_fullscreen(
                cmd,
                &self.convolve_pipeline,
                &[&self.convolve_groups[mip as usize - 1]],
                Some(bytemuck::bytes_of(&push)),
            )?;
            cmd.end_render_pass()?;
            engine_trace!("zenith3d::Environment", "Convolved mip {} (blur {:.3})", mip, push.blur);
        }
        cmd.barrier(&[Barrier::texture(&self.radiance, ResourceState::RenderTarget, ResourceState::ShaderRead)])
    }

    /// Blur applied to radiance mip `mip` of a `mip_count` chain
    pub fn blur_strength(mip: u32, mip_count: u32) -> f32 {
        if mip_count < 2 {
            return 0.0;
        }
        mip as f32 / (mip_count - 1) as f32
    }

    pub fn radiance(&self) -> &Arc<dyn Texture> {
        &self.radiance
    }

    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    pub fn state(&self) -> EnvironmentState {
        self.state
    }

    /// Number of completed regenerations
    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
