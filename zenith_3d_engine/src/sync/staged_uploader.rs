/// Staged uploads: CPU staging bytes → host-visible staging buffer →
/// `copy_buffer` into device-local GPU arrays.
///
/// Producers call `stage()` during the frame; the orchestrator calls
/// `flush()` exactly once per submission, before any pass reads the
/// destinations. A second flush in the same submission would overwrite
/// staging bytes still referenced by recorded copies.

use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, BufferCopy, CommandList,
};
use crate::{engine_trace, engine_warn};

/// Staging offsets are kept 16-byte aligned
const STAGING_ALIGNMENT: u64 = 16;

/// One staged copy: `size` bytes from `staging_offset` to `dst_offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRange {
    pub staging_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// What a flush recorded
#[derive(Default)]
pub struct FlushStats {
    pub bytes: u64,
    pub ranges: u32,
    /// Destinations written, in first-staged order
    pub destinations: Vec<Arc<dyn Buffer>>,
}

struct PendingTarget {
    buffer: Arc<dyn Buffer>,
    regions: Vec<BufferCopy>,
}

pub struct StagedUploader {
    device: Arc<dyn GraphicsDevice>,
    staging: Arc<dyn Buffer>,
    bytes: Vec<u8>,
    pending: Vec<PendingTarget>,
}

impl StagedUploader {
    pub fn new(device: Arc<dyn GraphicsDevice>, initial_capacity: u64) -> Result<Self> {
        let staging = Self::create_staging(device.as_ref(), initial_capacity.max(STAGING_ALIGNMENT))?;
        Ok(Self {
            device,
            staging,
            bytes: Vec::new(),
            pending: Vec::new(),
        })
    }

    fn create_staging(device: &dyn GraphicsDevice, size: u64) -> Result<Arc<dyn Buffer>> {
        device.create_buffer(BufferDesc {
            label: "staging".to_string(),
            size,
            usage: BufferUsage::Staging,
        })
    }

    /// Queue `bytes` for `target` at `dst_offset`
    pub fn stage(&mut self, target: &Arc<dyn Buffer>, dst_offset: u64, bytes: &[u8]) -> Result<CopyRange> {
        let size = bytes.len() as u64;
        if dst_offset + size > target.size() {
            return Err(Error::InvalidResource(format!(
                "upload of {} bytes at {} overflows '{}' ({} bytes)",
                size, dst_offset, target.label(), target.size())));
        }

        let staging_offset = (self.bytes.len() as u64).next_multiple_of(STAGING_ALIGNMENT);
        self.bytes.resize(staging_offset as usize, 0);
        self.bytes.extend_from_slice(bytes);

        let region = BufferCopy { src_offset: staging_offset, dst_offset, size };
        match self.pending.iter_mut().find(|p| Arc::ptr_eq(&p.buffer, target)) {
            Some(pending) => pending.regions.push(region),
            None => self.pending.push(PendingTarget {
                buffer: Arc::clone(target),
                regions: vec![region],
            }),
        }

        Ok(CopyRange { staging_offset, dst_offset, size })
    }

    /// Bytes waiting for the next flush
    pub fn pending_bytes(&self) -> u64 {
        self.pending.iter()
            .flat_map(|p| p.regions.iter())
            .map(|r| r.size)
            .sum()
    }

    /// Copy ranges waiting for the next flush
    pub fn pending_ranges(&self) -> usize {
        self.pending.iter().map(|p| p.regions.len()).sum()
    }

    /// Copy ranges waiting for `target`
    pub fn pending_ranges_for(&self, target: &Arc<dyn Buffer>) -> usize {
        self.pending.iter()
            .find(|p| Arc::ptr_eq(&p.buffer, target))
            .map_or(0, |p| p.regions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Size of the device staging buffer
    pub fn staging_capacity(&self) -> u64 {
        self.staging.size()
    }

    /// Write the staging bytes and record one copy per destination.
    ///
    /// Records nothing when no upload is pending.
    pub fn flush(&mut self, cmd: &mut dyn CommandList) -> Result<FlushStats> {
        if self.pending.is_empty() {
            return Ok(FlushStats::default());
        }

        let needed = self.bytes.len() as u64;
        if needed > self.staging.size() {
            let new_size = needed.next_power_of_two();
            engine_warn!("zenith3d::StagedUploader",
                "Growing staging buffer {} -> {} bytes", self.staging.size(), new_size);
            self.staging = Self::create_staging(self.device.as_ref(), new_size)?;
        }
        self.staging.update(0, &self.bytes)?;

        let mut stats = FlushStats::default();
        for pending in self.pending.drain(..) {
            cmd.copy_buffer(&self.staging, &pending.buffer, &pending.regions)?;
            stats.ranges += pending.regions.len() as u32;
            stats.bytes += pending.regions.iter().map(|r| r.size).sum::<u64>();
            stats.destinations.push(pending.buffer);
        }
        self.bytes.clear();

        engine_trace!("zenith3d::StagedUploader",
            "Flushed {} bytes in {} ranges to {} buffers",
            stats.bytes, stats.ranges, stats.destinations.len());
        Ok(stats)
    }

    /// Drop everything staged since the last flush
    pub fn discard(&mut self) {
        self.pending.clear();
        self.bytes.clear();
    }
}

#[cfg(test)]
#[path = "staged_uploader_tests.rs"]
mod tests;
