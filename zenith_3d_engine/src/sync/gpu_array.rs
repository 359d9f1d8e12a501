/// Fixed-capacity device-local array of records, one per slot.

use std::sync::Arc;
use bytemuck::Pod;
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, Buffer, BufferDesc, BufferUsage};
use super::staged_uploader::{StagedUploader, CopyRange};

pub struct GpuArray {
    buffer: Arc<dyn Buffer>,
    stride: u64,
    capacity: u32,
}

impl GpuArray {
    /// Array of `capacity` records of type `T`
    pub fn of<T: Pod>(device: &dyn GraphicsDevice, label: &str, capacity: u32) -> Result<Self> {
        Self::with_stride(device, label, capacity, std::mem::size_of::<T>() as u64, BufferUsage::Storage)
    }

    /// Array of `capacity` records of `stride` bytes each
    pub fn with_stride(
        device: &dyn GraphicsDevice,
        label: &str,
        capacity: u32,
        stride: u64,
        usage: BufferUsage,
    ) -> Result<Self> {
        let buffer = device.create_buffer(BufferDesc {
            label: label.to_string(),
            size: stride * capacity as u64,
            usage,
        })?;
        Ok(Self { buffer, stride, capacity })
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Byte offset of `slot`
    pub fn offset_of(&self, slot: u32) -> u64 {
        slot as u64 * self.stride
    }

    /// Stage raw bytes (at most one stride) into `slot`
    pub fn stage_bytes(&self, uploader: &mut StagedUploader, slot: u32, bytes: &[u8]) -> Result<CopyRange> {
        if slot >= self.capacity {
            return Err(Error::CapacityExceeded(format!(
                "slot {} outside '{}' ({} records)", slot, self.buffer.label(), self.capacity)));
        }
        if bytes.len() as u64 > self.stride {
            return Err(Error::InvalidResource(format!(
                "{} bytes do not fit a '{}' record ({} bytes)",
                bytes.len(), self.buffer.label(), self.stride)));
        }
        uploader.stage(&self.buffer, self.offset_of(slot), bytes)
    }

    /// Stage one record into `slot`
    pub fn stage<T: Pod>(&self, uploader: &mut StagedUploader, slot: u32, record: &T) -> Result<CopyRange> {
        self.stage_bytes(uploader, slot, bytemuck::bytes_of(record))
    }
}
