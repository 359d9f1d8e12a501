/// Texture trait, texture descriptor, and texture info

/// Texture and render target format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    D32_FLOAT,
}

impl TextureFormat {
    /// Whether the format is a depth format
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_FLOAT)
    }
}

/// Texture usage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Texture can be sampled in shaders
    Sampled,
    /// Texture can be used as render target
    RenderTarget,
    /// Texture can be used for both
    SampledAndRenderTarget,
    /// Texture can be used as depth attachment
    DepthStencil,
}

impl TextureUsage {
    /// Whether the texture may be attached to a render pass
    pub fn is_attachable(&self) -> bool {
        !matches!(self, TextureUsage::Sampled)
    }
}

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug label
    pub label: String,
    /// Width in pixels (mip 0)
    pub width: u32,
    /// Height in pixels (mip 0)
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
    /// Number of mip levels (1 = no mip chain)
    pub mip_levels: u32,
    /// Number of array layers (1 = simple 2D texture, >1 = texture array)
    pub array_layers: u32,
}

/// Read-only properties of a created texture.
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
    pub mip_levels: u32,
    pub array_layers: u32,
}

impl TextureInfo {
    /// Size of a given mip level (never below 1x1)
    pub fn mip_size(&self, mip_level: u32) -> (u32, u32) {
        ((self.width >> mip_level).max(1), (self.height >> mip_level).max(1))
    }
}

impl From<&TextureDesc> for TextureInfo {
    fn from(desc: &TextureDesc) -> Self {
        Self {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            mip_levels: desc.mip_levels,
            array_layers: desc.array_layers,
        }
    }
}

/// Texture resource trait
///
/// Implemented by backend-specific texture types.
/// The texture is automatically destroyed when dropped.
pub trait Texture: Send + Sync {
    /// Debug label given at creation
    fn label(&self) -> &str;

    /// Get the read-only properties of this texture
    fn info(&self) -> &TextureInfo;
}
