/// Buffer trait and buffer descriptor

use crate::error::Result;

/// Buffer usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Vertex buffer
    Vertex,
    /// Index buffer
    Index,
    /// Uniform/constant buffer
    Uniform,
    /// Storage buffer (device-local GPU arrays)
    Storage,
    /// Indirect draw arguments
    Indirect,
    /// Host-visible transfer source
    Staging,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone)]
pub struct BufferDesc {
    /// Debug label
    pub label: String,
    /// Size in bytes
    pub size: u64,
    /// Buffer usage
    pub usage: BufferUsage,
}

/// One region of a buffer-to-buffer copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types.
/// The buffer is automatically destroyed when dropped.
pub trait Buffer: Send + Sync {
    /// Debug label given at creation
    fn label(&self) -> &str;

    /// Size in bytes
    fn size(&self) -> u64;

    /// Usage given at creation
    fn usage(&self) -> BufferUsage;

    /// Write host data into the buffer
    ///
    /// Only valid for host-visible buffers (staging, uniform).
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Data to write
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Read back bytes from a host-visible buffer
    fn read(&self, offset: u64, size: u64) -> Result<Vec<u8>>;
}
