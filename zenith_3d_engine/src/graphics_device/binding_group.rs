/// BindingGroup trait and binding resources
///
/// A BindingGroup is a set of GPU resource bindings (buffers, textures)
/// created against a pipeline's set layout. Texture arrays can be
/// rewritten element by element (`GraphicsDevice::write_texture_binding`).

use crate::graphics_device::{Buffer, Texture};

/// A resource bound at one binding index (binding = position in the slice)
pub enum BindingResource<'a> {
    /// Uniform buffer
    UniformBuffer(&'a dyn Buffer),
    /// Storage buffer
    StorageBuffer(&'a dyn Buffer),
    /// Sampled texture (all mips and layers)
    SampledTexture(&'a dyn Texture),
    /// Sampled texture restricted to one mip level
    SampledTextureMip(&'a dyn Texture, u32),
    /// Array of sampled textures filled later via write_texture_binding
    TextureArray { count: u32 },
}

/// Binding group resource trait
pub trait BindingGroup: Send + Sync {
    /// Debug label
    fn label(&self) -> &str;

    /// Set index this group was created for
    fn set_index(&self) -> u32;
}
