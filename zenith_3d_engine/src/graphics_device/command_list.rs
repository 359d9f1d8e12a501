/// CommandList trait - for recording rendering commands

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferCopy, Texture, Pipeline, BindingGroup, IndexType, ShaderStage,
};

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-size viewport with depth range [0, 1]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// What happens to attachment contents at render pass begin
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Clear(ClearValue),
    Load,
    DontCare,
}

/// One render pass attachment: a single mip/layer of a texture
#[derive(Clone)]
pub struct Attachment {
    pub texture: Arc<dyn Texture>,
    pub mip_level: u32,
    pub layer: u32,
    pub load: LoadOp,
}

impl Attachment {
    /// Attach mip 0 / layer 0 with the given load op
    pub fn new(texture: &Arc<dyn Texture>, load: LoadOp) -> Self {
        Self { texture: Arc::clone(texture), mip_level: 0, layer: 0, load }
    }

    /// Attach a specific mip level
    pub fn mip(texture: &Arc<dyn Texture>, mip_level: u32, load: LoadOp) -> Self {
        Self { texture: Arc::clone(texture), mip_level, layer: 0, load }
    }

    /// Attach a specific array layer
    pub fn layer(texture: &Arc<dyn Texture>, layer: u32, load: LoadOp) -> Self {
        Self { texture: Arc::clone(texture), mip_level: 0, layer, load }
    }

    /// Pixel size of the attached mip level
    pub fn extent(&self) -> (u32, u32) {
        self.texture.info().mip_size(self.mip_level)
    }
}

/// Render pass begin descriptor (dynamic rendering style)
#[derive(Clone)]
pub struct RenderPassDesc {
    pub label: String,
    pub color_attachments: Vec<Attachment>,
    pub depth_attachment: Option<Attachment>,
}

/// Resource usage state, for ordering barriers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Undefined,
    TransferDst,
    ShaderRead,
    RenderTarget,
    DepthWrite,
    IndirectArgument,
}

/// Resource a barrier applies to
#[derive(Clone)]
pub enum BarrierResource {
    Buffer(Arc<dyn Buffer>),
    Texture(Arc<dyn Texture>),
}

impl BarrierResource {
    /// Label of the underlying resource
    pub fn label(&self) -> &str {
        match self {
            BarrierResource::Buffer(buffer) => buffer.label(),
            BarrierResource::Texture(texture) => texture.label(),
        }
    }
}

/// One ordering barrier: all `before` accesses complete before `after` ones start
#[derive(Clone)]
pub struct Barrier {
    pub resource: BarrierResource,
    pub before: ResourceState,
    pub after: ResourceState,
}

impl Barrier {
    pub fn buffer(buffer: &Arc<dyn Buffer>, before: ResourceState, after: ResourceState) -> Self {
        Self { resource: BarrierResource::Buffer(Arc::clone(buffer)), before, after }
    }

    pub fn texture(texture: &Arc<dyn Texture>, before: ResourceState, after: ResourceState) -> Self {
        Self { resource: BarrierResource::Texture(Arc::clone(texture)), before, after }
    }
}

/// Size in bytes of one `DrawIndexedIndirect` command
pub const DRAW_INDEXED_INDIRECT_STRIDE: u32 = 20;

/// Command list for recording rendering commands
///
/// Commands are recorded and later submitted via `GraphicsDevice::submit()`.
pub trait CommandList: Send + Sync {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Copy regions from `src` into `dst` (outside render passes)
    fn copy_buffer(
        &mut self,
        src: &Arc<dyn Buffer>,
        dst: &Arc<dyn Buffer>,
        regions: &[BufferCopy],
    ) -> Result<()>;

    /// Insert ordering barriers between pass boundaries
    fn barrier(&mut self, barriers: &[Barrier]) -> Result<()>;

    /// Begin a render pass on the given attachments
    fn begin_render_pass(&mut self, desc: &RenderPassDesc) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline
    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a binding group at the given set index
    fn bind_binding_group(
        &mut self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_group: &Arc<dyn BindingGroup>,
    ) -> Result<()>;

    /// Push constants to the pipeline
    fn push_constants(&mut self, stages: &[ShaderStage], offset: u32, data: &[u8]) -> Result<()>;

    /// Bind a vertex buffer
    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    /// Draw non-indexed vertices
    fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()>;

    /// Draw indexed vertices
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;

    /// Draw `draw_count` indexed commands read from `buffer` at `offset`
    fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<dyn Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<()>;
}
