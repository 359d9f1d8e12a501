/// GraphicsDevice trait - resource factory and submission interface

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, Texture, TextureDesc, Pipeline, PipelineDesc,
    BindingGroup, BindingResource, CommandList,
};

/// Graphics device capability consumed by the engine
///
/// This is the low-level primitive layer (buffers, images, pipelines,
/// command lists). Backends (Vulkan, D3D12, ...) implement it outside
/// this crate; `MockGraphicsDevice` implements it for headless tests.
pub trait GraphicsDevice: Send + Sync {
    /// Create a buffer
    fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a texture
    fn create_texture(&self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a graphics pipeline
    fn create_pipeline(&self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Create a binding group for `set_index` of `pipeline`
    ///
    /// Each resource is bound at the binding index equal to its position.
    fn create_binding_group(
        &self,
        pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingGroup>>;

    /// Rewrite one element of a texture-array binding
    fn write_texture_binding(
        &self,
        group: &Arc<dyn BindingGroup>,
        binding: u32,
        element: u32,
        texture: &Arc<dyn Texture>,
    ) -> Result<()>;

    /// Create a command list for recording rendering commands
    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit command lists for execution on the GPU
    fn submit(&self, commands: &[&dyn CommandList]) -> Result<()>;

    /// Block until all submitted work has completed
    fn wait_idle(&self) -> Result<()>;
}
