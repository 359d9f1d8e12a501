/// Recording graphics device (no GPU required)
///
/// `MockGraphicsDevice` implements the full device capability in host
/// memory. Buffers keep their bytes, buffer copies execute when recorded,
/// and every recorded command lands in a shared journal that tests read
/// back through `commands()`, `pass_draw_count()` and friends.

use std::sync::{Arc, Mutex, MutexGuard};
use crate::error::{Error, Result};
use crate::engine_bail;
use crate::graphics_device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, BufferCopy,
    Texture, TextureDesc, TextureInfo, Pipeline, PipelineDesc,
    BindingGroup, BindingResource, CommandList, Barrier, RenderPassDesc,
    ResourceState, Viewport, Rect2D, IndexType, ShaderStage,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Recorded commands
// ============================================================================

/// One attachment as seen by the journal: (texture label, mip, layer)
pub type AttachmentRecord = (String, u32, u32);

/// A command captured by `MockCommandList` or `MockGraphicsDevice::submit`
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin,
    End,
    CopyBuffer { src: String, dst: String, regions: Vec<BufferCopy> },
    Barrier { transitions: Vec<(String, ResourceState, ResourceState)> },
    BeginRenderPass {
        label: String,
        color: Vec<AttachmentRecord>,
        depth: Option<AttachmentRecord>,
    },
    EndRenderPass,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline(String),
    BindBindingGroup { set_index: u32, label: String },
    PushConstants { offset: u32, data: Vec<u8> },
    BindVertexBuffer(String),
    BindIndexBuffer(String, IndexType),
    Draw { vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32 },
    DrawIndexed { index_count: u32, instance_count: u32, first_index: u32, vertex_offset: i32, first_instance: u32 },
    DrawIndexedIndirect { buffer: String, offset: u64, draw_count: u32, stride: u32 },
    Submit { command_lists: usize },
}

impl RecordedCommand {
    /// Number of draws this command issues (indirect counts every record)
    pub fn draw_count(&self) -> u32 {
        match self {
            RecordedCommand::Draw { .. } | RecordedCommand::DrawIndexed { .. } => 1,
            RecordedCommand::DrawIndexedIndirect { draw_count, .. } => *draw_count,
            _ => 0,
        }
    }
}

/// A `write_texture_binding` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureWrite {
    pub group: String,
    pub binding: u32,
    pub element: u32,
    pub texture: String,
}

// ============================================================================
// Mock Buffer
// ============================================================================

pub struct MockBuffer {
    label: String,
    usage: BufferUsage,
    data: Mutex<Vec<u8>>,
}

impl MockBuffer {
    pub fn new(label: &str, size: u64, usage: BufferUsage) -> Self {
        Self {
            label: label.to_string(),
            usage,
            data: Mutex::new(vec![0u8; size as usize]),
        }
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<()> {
        let size = self.size();
        if offset.checked_add(len).map_or(true, |end| end > size) {
            return Err(Error::InvalidResource(format!(
                "range {}..{} out of bounds for buffer '{}' ({} bytes)",
                offset, offset.saturating_add(len), self.label, size)));
        }
        Ok(())
    }
}

impl Buffer for MockBuffer {
    fn label(&self) -> &str {
        &self.label
    }

    fn size(&self) -> u64 {
        lock(&self.data).len() as u64
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len() as u64)?;
        let start = offset as usize;
        lock(&self.data)[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>> {
        self.check_range(offset, size)?;
        let start = offset as usize;
        Ok(lock(&self.data)[start..start + size as usize].to_vec())
    }
}

// ============================================================================
// Mock Texture
// ============================================================================

pub struct MockTexture {
    label: String,
    info: TextureInfo,
}

impl MockTexture {
    pub fn new(desc: &TextureDesc) -> Self {
        Self { label: desc.label.clone(), info: TextureInfo::from(desc) }
    }
}

impl Texture for MockTexture {
    fn label(&self) -> &str {
        &self.label
    }

    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

// ============================================================================
// Mock Pipeline / BindingGroup
// ============================================================================

pub struct MockPipeline {
    desc: PipelineDesc,
}

impl MockPipeline {
    pub fn desc(&self) -> &PipelineDesc {
        &self.desc
    }
}

impl Pipeline for MockPipeline {
    fn program(&self) -> &str {
        &self.desc.program
    }
}

pub struct MockBindingGroup {
    label: String,
    set_index: u32,
}

impl BindingGroup for MockBindingGroup {
    fn label(&self) -> &str {
        &self.label
    }

    fn set_index(&self) -> u32 {
        self.set_index
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

/// Command list writing straight into its device's journal
pub struct MockCommandList {
    journal: Arc<Mutex<Vec<RecordedCommand>>>,
    recording: bool,
    in_render_pass: bool,
}

impl MockCommandList {
    fn push(&self, command: RecordedCommand) {
        lock(&self.journal).push(command);
    }

    fn require_recording(&self, what: &str) -> Result<()> {
        if !self.recording {
            engine_bail!("zenith3d::MockDevice", "{} recorded outside begin/end", what);
        }
        Ok(())
    }

    fn require_render_pass(&self, what: &str) -> Result<()> {
        self.require_recording(what)?;
        if !self.in_render_pass {
            engine_bail!("zenith3d::MockDevice", "{} recorded outside a render pass", what);
        }
        Ok(())
    }
}

fn attachment_record(
    attachment: &crate::graphics_device::Attachment,
) -> Result<AttachmentRecord> {
    let info = attachment.texture.info();
    if !info.usage.is_attachable() {
        return Err(Error::InvalidResource(format!(
            "texture '{}' is not attachable", attachment.texture.label())));
    }
    if attachment.mip_level >= info.mip_levels || attachment.layer >= info.array_layers {
        return Err(Error::InvalidResource(format!(
            "texture '{}' has no mip {} / layer {}",
            attachment.texture.label(), attachment.mip_level, attachment.layer)));
    }
    Ok((attachment.texture.label().to_string(), attachment.mip_level, attachment.layer))
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.recording = true;
        self.push(RecordedCommand::Begin);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if self.in_render_pass {
            engine_bail!("zenith3d::MockDevice", "end() called inside a render pass");
        }
        self.recording = false;
        self.push(RecordedCommand::End);
        Ok(())
    }

    fn copy_buffer(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Buffer>,
        regions: &[BufferCopy],
    ) -> Result<()> {
        self.require_recording("copy_buffer")?;
        if self.in_render_pass {
            engine_bail!("zenith3d::MockDevice", "copy_buffer recorded inside a render pass");
        }
        for region in regions {
            let bytes = src.read(region.src_offset, region.size)?;
            dst.update(region.dst_offset, &bytes)?;
        }
        self.push(RecordedCommand::CopyBuffer {
            src: src.label().to_string(),
            dst: dst.label().to_string(),
            regions: regions.to_vec(),
        });
        Ok(())
    }

    fn barrier(&mut self, barriers: &[Barrier]) -> Result<()> {
        self.require_recording("barrier")?;
        self.push(RecordedCommand::Barrier {
            transitions: barriers.iter()
                .map(|b| (b.resource.label().to_string(), b.before, b.after))
                .collect(),
        });
        Ok(())
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()> {
        self.require_recording("begin_render_pass")?;
        if self.in_render_pass {
            engine_bail!("zenith3d::MockDevice", "render pass '{}' nested in another pass", desc.label);
        }
        let color = desc.color_attachments.iter()
            .map(attachment_record)
            .collect::<Result<Vec<_>>>()?;
        let depth = desc.depth_attachment.as_ref().map(attachment_record).transpose()?;
        self.in_render_pass = true;
        self.push(RecordedCommand::BeginRenderPass { label: desc.label.clone(), color, depth });
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.require_render_pass("end_render_pass")?;
        self.in_render_pass = false;
        self.push(RecordedCommand::EndRenderPass);
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_render_pass("set_viewport")?;
        self.push(RecordedCommand::SetViewport(viewport));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_render_pass("set_scissor")?;
        self.push(RecordedCommand::SetScissor(scissor));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.require_render_pass("bind_pipeline")?;
        self.push(RecordedCommand::BindPipeline(pipeline.program().to_string()));
        Ok(())
    }

    fn bind_binding_group(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()> {
        self.require_render_pass("bind_binding_group")?;
        self.push(RecordedCommand::BindBindingGroup {
            set_index,
            label: binding_group.label().to_string(),
        });
        Ok(())
    }

    fn push_constants(&mut self, _stages: &[ShaderStage], offset: u32, data: &[u8]) -> Result<()> {
        self.require_render_pass("push_constants")?;
        self.push(RecordedCommand::PushConstants { offset, data: data.to_vec() });
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.require_render_pass("bind_vertex_buffer")?;
        self.push(RecordedCommand::BindVertexBuffer(buffer.label().to_string()));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64, index_type: IndexType) -> Result<()> {
        self.require_render_pass("bind_index_buffer")?;
        self.push(RecordedCommand::BindIndexBuffer(buffer.label().to_string(), index_type));
        Ok(())
    }

    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        self.require_render_pass("draw")?;
        self.push(RecordedCommand::Draw { vertex_count, instance_count, first_vertex, first_instance });
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.require_render_pass("draw_indexed")?;
        self.push(RecordedCommand::DrawIndexed {
            index_count, instance_count, first_index, vertex_offset, first_instance,
        });
        Ok(())
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.require_render_pass("draw_indexed_indirect")?;
        let needed = offset + draw_count as u64 * stride as u64;
        if needed > buffer.size() {
            return Err(Error::InvalidResource(format!(
                "indirect draw reads {} bytes past '{}' ({} bytes)",
                needed, buffer.label(), buffer.size())));
        }
        self.push(RecordedCommand::DrawIndexedIndirect {
            buffer: buffer.label().to_string(), offset, draw_count, stride,
        });
        Ok(())
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

#[derive(Default)]
struct DeviceState {
    texture_writes: Vec<TextureWrite>,
    buffers_created: u32,
    textures_created: u32,
    pipelines_created: u32,
    fail_next_submit: bool,
    fail_next_wait: bool,
}

/// Headless device recording everything it is asked to do
pub struct MockGraphicsDevice {
    journal: Arc<Mutex<Vec<RecordedCommand>>>,
    state: Mutex<DeviceState>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(Vec::new())),
            state: Mutex::new(DeviceState::default()),
        }
    }

    /// Snapshot of every recorded command, in recording order
    pub fn commands(&self) -> Vec<RecordedCommand> {
        lock(&self.journal).clone()
    }

    /// Forget recorded commands and texture writes
    pub fn clear_commands(&self) {
        lock(&self.journal).clear();
        lock(&self.state).texture_writes.clear();
    }

    /// Snapshot of every texture-binding write
    pub fn texture_writes(&self) -> Vec<TextureWrite> {
        lock(&self.state).texture_writes.clone()
    }

    /// Total draws recorded inside render passes labelled `label`
    pub fn pass_draw_count(&self, label: &str) -> u32 {
        let mut inside = false;
        let mut total = 0;
        for command in lock(&self.journal).iter() {
            match command {
                RecordedCommand::BeginRenderPass { label: l, .. } => inside = l == label,
                RecordedCommand::EndRenderPass => inside = false,
                other if inside => total += other.draw_count(),
                _ => {}
            }
        }
        total
    }

    /// Number of render passes begun with `label`
    pub fn pass_count(&self, label: &str) -> usize {
        lock(&self.journal).iter()
            .filter(|c| matches!(c, RecordedCommand::BeginRenderPass { label: l, .. } if l == label))
            .count()
    }

    /// Every copy region recorded into buffer `dst`
    pub fn copies_into(&self, dst: &str) -> Vec<BufferCopy> {
        lock(&self.journal).iter()
            .filter_map(|c| match c {
                RecordedCommand::CopyBuffer { dst: d, regions, .. } if d == dst => Some(regions.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Number of submissions recorded
    pub fn submit_count(&self) -> usize {
        lock(&self.journal).iter()
            .filter(|c| matches!(c, RecordedCommand::Submit { .. }))
            .count()
    }

    pub fn buffers_created(&self) -> u32 {
        lock(&self.state).buffers_created
    }

    pub fn textures_created(&self) -> u32 {
        lock(&self.state).textures_created
    }

    pub fn pipelines_created(&self) -> u32 {
        lock(&self.state).pipelines_created
    }

    /// Make the next `submit` fail with `DeviceLost`
    pub fn fail_next_submit(&self) {
        lock(&self.state).fail_next_submit = true;
    }

    /// Make the next `wait_idle` fail with `DeviceLost`
    pub fn fail_next_wait(&self) {
        lock(&self.state).fail_next_wait = true;
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if desc.size == 0 {
            return Err(Error::InvalidResource(format!("buffer '{}' has zero size", desc.label)));
        }
        lock(&self.state).buffers_created += 1;
        Ok(Arc::new(MockBuffer::new(&desc.label, desc.size, desc.usage)))
    }

    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if desc.width == 0 || desc.height == 0 || desc.mip_levels == 0 || desc.array_layers == 0 {
            return Err(Error::InvalidResource(format!(
                "texture '{}' has an empty extent ({}x{}, {} mips, {} layers)",
                desc.label, desc.width, desc.height, desc.mip_levels, desc.array_layers)));
        }
        lock(&self.state).textures_created += 1;
        Ok(Arc::new(MockTexture::new(&desc)))
    }

    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        lock(&self.state).pipelines_created += 1;
        Ok(Arc::new(MockPipeline { desc }))
    }

    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>> {
        for (binding, resource) in resources.iter().enumerate() {
            if let BindingResource::SampledTextureMip(texture, mip) = resource {
                if *mip >= texture.info().mip_levels {
                    return Err(Error::InvalidResource(format!(
                        "binding {} of '{}' selects missing mip {} of '{}'",
                        binding, pipeline.program(), mip, texture.label())));
                }
            }
        }
        Ok(Arc::new(MockBindingGroup {
            label: format!("{}#{}", pipeline.program(), set_index),
            set_index,
        }))
    }

    fn write_texture_binding(
        &self,
        group: &Arc<dyn BindingGroup>,
        binding: u32,
        element: u32,
        texture: &Arc<dyn Texture>,
    ) -> Result<()> {
        lock(&self.state).texture_writes.push(TextureWrite {
            group: group.label().to_string(),
            binding,
            element,
            texture: texture.label().to_string(),
        });
        Ok(())
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            journal: Arc::clone(&self.journal),
            recording: false,
            in_render_pass: false,
        }))
    }

    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if state.fail_next_submit {
                state.fail_next_submit = false;
                return Err(Error::DeviceLost("injected submit failure".to_string()));
            }
        }
        lock(&self.journal).push(RecordedCommand::Submit { command_lists: commands.len() });
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail_next_wait {
            state.fail_next_wait = false;
            return Err(Error::DeviceLost("injected wait failure".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
