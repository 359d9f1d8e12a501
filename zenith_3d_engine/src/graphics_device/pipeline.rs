/// Pipeline trait and pipeline descriptor
///
/// Shader programs are owned by the backend; a pipeline names its program
/// through `PipelineDesc::program` and the backend resolves it.

use crate::graphics_device::TextureFormat;

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 16-bit indices
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Vertex input expected by a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexInput {
    /// Vertices generated in the shader (fullscreen passes, terrain/water grids)
    None,
    /// Static mesh vertices
    Mesh,
    /// Skinned mesh vertices (joint indices + weights)
    SkinnedMesh,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Descriptor for creating a graphics pipeline
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    /// Shader program name, resolved by the backend
    pub program: String,
    /// Vertex input layout
    pub vertex_input: VertexInput,
    /// Color attachment formats, in attachment order
    pub color_formats: Vec<TextureFormat>,
    /// Depth attachment format
    pub depth_format: Option<TextureFormat>,
    /// Enable depth test/write
    pub depth_test: bool,
    /// Face culling
    pub cull_mode: CullMode,
    /// Push constant range size in bytes
    pub push_constant_size: u32,
}

/// Graphics pipeline resource trait
pub trait Pipeline: Send + Sync {
    /// Shader program name this pipeline was created from
    fn program(&self) -> &str;
}
