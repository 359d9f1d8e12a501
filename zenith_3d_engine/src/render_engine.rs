/// Zenith3D render engine: the per-frame orchestrator.
///
/// `RenderEngine` is an explicit context. It owns every piece of renderer
/// state (slot pools, GPU arrays, indirect tables, passes and targets);
/// there is no process-wide renderer. Each `render_frame` records one
/// command list:
///
/// ```text
/// sync -> indirect tables -> shadow matrices -> camera -> flush
///      -> environment -> shadow -> geometry -> lighting -> compose
/// ```
///
/// submits it, and blocks until the device is idle.
///
/// # Example
///
/// ```ignore
/// let mut engine = RenderEngine::new(EngineConfig::default(), device, geometry)?;
/// loop {
///     // ... mutate the scene ...
///     let stats = engine.render_frame(&mut scene, &camera, &swapchain_image)?;
/// }
/// ```

use std::sync::Arc;
use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::draw::IndirectDrawTable;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureDesc, TextureFormat, TextureUsage, BufferUsage, CommandList,
    Attachment, LoadOp, ClearValue, Barrier, ResourceState, RenderPassDesc,
};
use crate::passes::{
    EnvironmentUpdater, ShadowPass, GeometryPass, GeometryBuffers, LightingPass,
    LightingPushConstants, ComposePass,
};
use crate::scene::{Model, ModelInstanceKey, Scene};
use crate::sync::{GpuArray, GpuCamera, SceneSynchronizer, StagedUploader, SyncReport};
use crate::utils::SlotAllocator;
use crate::{engine_debug, engine_error, engine_info, engine_trace};

/// Initial size of the staging buffer
const INITIAL_STAGING_BYTES: u64 = 256 * 1024;

/// Initial command capacity of each indirect table
const INITIAL_INDIRECT_COMMANDS: u32 = 256;

/// What one `render_frame` did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameStats {
    /// Scene frame that was rendered
    pub frame: u64,
    /// Records staged by the synchronizer (bone palettes included)
    pub records_uploaded: u32,
    /// Entities dropped because their pool was full
    pub entities_dropped: u32,
    /// Bytes and copy ranges transferred by the single flush
    pub bytes_uploaded: u64,
    pub copy_ranges: u32,
    /// Indirect tables regenerated (0, 1 or 2)
    pub tables_rebuilt: u32,
    pub environment_regenerated: bool,
    pub shadow_casters: u32,
    pub shadow_matrices_recomputed: u32,
    pub static_draws: u32,
    pub animated_draws: u32,
    pub terrain_draws: u32,
    pub water_draws: u32,
}

pub struct RenderEngine {
    config: EngineConfig,
    device: Arc<dyn GraphicsDevice>,
    uploader: StagedUploader,
    sync: SceneSynchronizer,
    static_table: IndirectDrawTable,
    animated_table: IndirectDrawTable,
    camera: GpuArray,
    geometry: GeometryBuffers,
    environment: EnvironmentUpdater,
    shadow: ShadowPass,
    geometry_pass: GeometryPass,
    lighting: LightingPass,
    compose: ComposePass,
    fallback: Arc<dyn Texture>,
    fallback_ready: bool,
    /// Indirect tables must be regenerated whatever the sync reports
    tables_stale: bool,
    time: f32,
    frames_rendered: u64,
}

impl RenderEngine {
    /// Build every GPU resource the engine needs.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` for an invalid configuration and
    /// propagates any device creation failure.
    pub fn new(config: EngineConfig, device: Arc<dyn GraphicsDevice>, geometry: GeometryBuffers) -> Result<Self> {
        config.validate()?;
        let dev = device.as_ref();

        let uploader = StagedUploader::new(Arc::clone(&device), INITIAL_STAGING_BYTES)?;
        let sync = SceneSynchronizer::new(dev, &config)?;
        let static_table = IndirectDrawTable::new(dev, "static_indirect", INITIAL_INDIRECT_COMMANDS)?;
        let animated_table = IndirectDrawTable::new(dev, "animated_indirect", INITIAL_INDIRECT_COMMANDS)?;
        let camera = GpuArray::with_stride(
            dev, "camera", 1, std::mem::size_of::<GpuCamera>() as u64, BufferUsage::Uniform)?;
        let fallback = dev.create_texture(TextureDesc {
            label: "fallback_white".to_string(),
            width: 1,
            height: 1,
            format: TextureFormat::R8G8B8A8_UNORM,
            usage: TextureUsage::SampledAndRenderTarget,
            mip_levels: 1,
            array_layers: 1,
        })?;

        let environment = EnvironmentUpdater::new(dev, &config)?;
        let shadow = ShadowPass::new(dev, &config, &sync)?;
        let geometry_pass = GeometryPass::new(dev, &config, camera.buffer(), &sync, &fallback)?;
        let lighting = LightingPass::new(dev, geometry_pass.gbuffer(), &sync, &shadow, &environment)?;

        engine_info!("zenith3d::RenderEngine",
            "Render engine created ({}x{}, {} lights, {} static / {} animated instances, {} casters)",
            config.render_width, config.render_height, config.capacities.lights,
            config.capacities.static_instances, config.capacities.animated_instances,
            config.capacities.shadow_casters);

        Ok(Self {
            config,
            device,
            uploader,
            sync,
            static_table,
            animated_table,
            camera,
            geometry,
            environment,
            shadow,
            geometry_pass,
            lighting,
            compose: ComposePass::new(),
            fallback,
            fallback_ready: false,
            tables_stale: false,
            time: 0.0,
            frames_rendered: 0,
        })
    }

    /// Render `scene` as seen by `camera` into `destination`.
    ///
    /// Advances the scene frame once the submission has completed, so
    /// mutations made after this call are seen as changes by the next one.
    ///
    /// # Errors
    ///
    /// Any device failure (recording, submission, completion wait) is
    /// fatal for the frame and returned as is. The scene frame does not
    /// advance, and the next call re-uploads the whole scene.
    pub fn render_frame(&mut self, scene: &mut Scene, camera: &Camera, destination: &Arc<dyn Texture>) -> Result<FrameStats> {
        let format = destination.info().format;
        if format.is_depth() {
            return Err(Self::log_and_return_error(Error::InvalidResource(format!(
                "destination '{}' has depth format {:?}", destination.label(), format))));
        }

        let mut cmd = self.device.create_command_list()?;
        let stats = match self.record_frame(cmd.as_mut(), scene, camera, destination) {
            Ok(stats) => stats,
            Err(error) => {
                self.uploader.discard();
                return Err(self.abandon_frame(scene, error));
            }
        };

        if let Err(error) = self.device.submit(&[cmd.as_ref()]) {
            return Err(self.abandon_frame(scene, error));
        }
        if let Err(error) = self.device.wait_idle() {
            return Err(self.abandon_frame(scene, error));
        }

        scene.advance_frame();
        self.fallback_ready = true;
        self.frames_rendered += 1;
        engine_trace!("zenith3d::RenderEngine", "Frame {} done: {:?}", stats.frame, stats);
        Ok(stats)
    }

    /// Forget every upload of a frame that did not complete
    fn abandon_frame(&mut self, scene: &mut Scene, error: Error) -> Error {
        self.sync.invalidate();
        self.shadow.invalidate();
        self.tables_stale = true;
        scene.mark_sky_dirty();
        Self::log_and_return_error(error)
    }

    fn log_and_return_error(error: Error) -> Error {
        engine_error!("zenith3d::RenderEngine", "Frame failed: {}", error);
        error
    }

    fn record_frame(
        &mut self,
        cmd: &mut dyn CommandList,
        scene: &mut Scene,
        camera: &Camera,
        destination: &Arc<dyn Texture>,
    ) -> Result<FrameStats> {
        let mut stats = FrameStats { frame: scene.frame(), ..FrameStats::default() };
        cmd.begin()?;

        if !self.fallback_ready {
            let white = Attachment::new(&self.fallback, LoadOp::Clear(ClearValue::Color([1.0; 4])));
            cmd.begin_render_pass(&RenderPassDesc {
                label: "fallback_init".to_string(),
                color_attachments: vec![white],
                depth_attachment: None,
            })?;
            cmd.end_render_pass()?;
            cmd.barrier(&[Barrier::texture(&self.fallback, ResourceState::RenderTarget, ResourceState::ShaderRead)])?;
        }

        // ===== UPLOADS =====
        let report = self.sync.sync(scene, &mut self.uploader)?;
        stats.records_uploaded = report.uploaded();
        stats.entities_dropped = report.dropped();
        stats.tables_rebuilt = self.rebuild_tables(scene, &report)?;
        stats.shadow_matrices_recomputed = self.shadow.prepare(scene, &self.sync, camera, &mut self.uploader)?;
        self.camera.stage(&mut self.uploader, 0, &GpuCamera::new(camera, self.time))?;

        let flushed = self.uploader.flush(cmd)?;
        stats.bytes_uploaded = flushed.bytes;
        stats.copy_ranges = flushed.ranges;
        if !flushed.destinations.is_empty() {
            let barriers: Vec<Barrier> = flushed.destinations.iter()
                .map(|buffer| {
                    let after = match buffer.usage() {
                        BufferUsage::Indirect => ResourceState::IndirectArgument,
                        _ => ResourceState::ShaderRead,
                    };
                    Barrier::buffer(buffer, ResourceState::TransferDst, after)
                })
                .collect();
            cmd.barrier(&barriers)?;
        }
        self.geometry_pass.apply_rebinds(self.device.as_ref(), &report.rebinds)?;

        // ===== PASSES =====
        stats.environment_regenerated = self.environment.update(self.device.as_ref(), cmd, scene)?;

        stats.shadow_casters = self.shadow.render(
            cmd, &self.sync, &self.static_table, &self.animated_table, &self.geometry)?;
        let atlas_before = if stats.shadow_casters > 0 { ResourceState::RenderTarget } else { ResourceState::Undefined };
        cmd.barrier(&[Barrier::texture(self.shadow.atlas(), atlas_before, ResourceState::ShaderRead)])?;

        let gbuffer = self.geometry_pass.gbuffer();
        let mut targets: Vec<Barrier> = gbuffer.color_targets().iter()
            .map(|t| Barrier::texture(t, ResourceState::Undefined, ResourceState::RenderTarget))
            .collect();
        targets.push(Barrier::texture(&gbuffer.depth, ResourceState::Undefined, ResourceState::DepthWrite));
        cmd.barrier(&targets)?;

        let drawn = self.geometry_pass.record(
            cmd, scene, &self.sync, &self.static_table, &self.animated_table, &self.geometry)?;
        stats.static_draws = drawn.static_draws;
        stats.animated_draws = drawn.animated_draws;
        stats.terrain_draws = drawn.terrain_draws;
        stats.water_draws = drawn.water_draws;

        let gbuffer = self.geometry_pass.gbuffer();
        let mut reads: Vec<Barrier> = gbuffer.color_targets().iter()
            .map(|t| Barrier::texture(t, ResourceState::RenderTarget, ResourceState::ShaderRead))
            .collect();
        reads.push(Barrier::texture(&gbuffer.depth, ResourceState::DepthWrite, ResourceState::ShaderRead));
        reads.push(Barrier::texture(self.lighting.lit(), ResourceState::Undefined, ResourceState::RenderTarget));
        cmd.barrier(&reads)?;

        let push = LightingPushConstants::new(
            scene, camera, &self.sync, self.environment.mip_count(), self.config.esm_exponent);
        self.lighting.record(cmd, &push)?;
        cmd.barrier(&[Barrier::texture(self.lighting.lit(), ResourceState::RenderTarget, ResourceState::ShaderRead)])?;

        cmd.barrier(&[Barrier::texture(destination, ResourceState::Undefined, ResourceState::RenderTarget)])?;
        self.compose.record(self.device.as_ref(), cmd, self.lighting.lit(), destination, self.config.exposure)?;

        cmd.end()?;
        Ok(stats)
    }

    /// Rebuild and stage the indirect table of each instance category
    /// whose population changed.
    fn rebuild_tables(&mut self, scene: &Scene, report: &SyncReport) -> Result<u32> {
        let stale = std::mem::take(&mut self.tables_stale);
        let dev = self.device.as_ref();
        let mut rebuilt = 0;
        if stale || report.static_instances.population_changed() {
            let models = live_models(scene, self.sync.static_instances());
            self.static_table.rebuild(models.iter().map(|(slot, model)| (*slot, model.as_ref())));
            self.static_table.upload(dev, &mut self.uploader)?;
            rebuilt += 1;
        }
        if stale || report.animated_instances.population_changed() {
            let models = live_models(scene, self.sync.animated_instances());
            self.animated_table.rebuild(models.iter().map(|(slot, model)| (*slot, model.as_ref())));
            self.animated_table.upload(dev, &mut self.uploader)?;
            rebuilt += 1;
        }
        if rebuilt > 0 {
            engine_debug!("zenith3d::RenderEngine",
                "Indirect tables: {} static, {} animated commands",
                self.static_table.len(), self.animated_table.len());
        }
        Ok(rebuilt)
    }

    /// Recreate the size-dependent targets (G-buffer and lit buffer).
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidResource(format!("invalid render size {}x{}", width, height)));
        }
        let dev = self.device.as_ref();
        self.geometry_pass.resize(dev, width, height)?;
        self.lighting.resize(dev, self.geometry_pass.gbuffer(), &self.sync, &self.shadow, &self.environment)?;
        self.compose.invalidate();
        self.config.render_width = width;
        self.config.render_height = height;
        engine_info!("zenith3d::RenderEngine", "Resized render targets to {}x{}", width, height);
        Ok(())
    }

    /// Animation time in seconds, forwarded to shaders (water waves)
    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &SceneSynchronizer {
        &self.sync
    }

    pub fn static_table(&self) -> &IndirectDrawTable {
        &self.static_table
    }

    pub fn animated_table(&self) -> &IndirectDrawTable {
        &self.animated_table
    }

    pub fn environment(&self) -> &EnvironmentUpdater {
        &self.environment
    }

    pub fn shadow(&self) -> &ShadowPass {
        &self.shadow
    }

    pub fn geometry_pass(&self) -> &GeometryPass {
        &self.geometry_pass
    }

    pub fn lighting(&self) -> &LightingPass {
        &self.lighting
    }

    /// Frames successfully submitted
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

/// Models of every live instance of one pool, in slot order
fn live_models(scene: &Scene, pool: &SlotAllocator<ModelInstanceKey>) -> Vec<(u32, Arc<Model>)> {
    pool.iter()
        .filter_map(|(slot, key)| scene.instance(key).map(|instance| (slot, Arc::clone(instance.model()))))
        .collect()
}

#[cfg(test)]
#[path = "render_engine_tests.rs"]
mod tests;
