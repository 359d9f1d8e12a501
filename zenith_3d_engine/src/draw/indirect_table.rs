//! Indirect draw table: one `DrawIndexedIndirect` per (instance, subrange).
//!
//! The table is rebuilt wholesale when the owning category's population
//! changes; transforms and other per-instance data flow through the
//! instance array instead. `first_instance` carries a tag the shaders
//! unpack into the instance slot and the material slot.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use rdst::{RadixKey, RadixSort};
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, DRAW_INDEXED_INDIRECT_STRIDE,
};
use crate::scene::Model;
use crate::sync::StagedUploader;
use crate::{engine_debug, engine_trace};

/// GPU layout of one indexed indirect draw
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    /// Packed (instance slot, material slot) tag
    pub first_instance: u32,
}

impl DrawIndexedIndirect {
    fn sort_key(&self) -> u64 {
        ((self.first_instance as u64) << 32) | self.first_index as u64
    }
}

/// Tag order first, then index range, so each instance's draws are contiguous
impl RadixKey for DrawIndexedIndirect {
    const LEVELS: usize = 8;

    #[inline]
    fn get_level(&self, level: usize) -> u8 {
        (self.sort_key() >> (level * 8)) as u8
    }
}

/// Pack an instance slot (< 65536) and a material slot into a draw tag
pub fn pack_tag(instance_slot: u32, material_slot: u16) -> u32 {
    (instance_slot << 16) | material_slot as u32
}

/// Inverse of `pack_tag`
pub fn unpack_tag(tag: u32) -> (u32, u16) {
    (tag >> 16, (tag & 0xFFFF) as u16)
}

pub struct IndirectDrawTable {
    label: String,
    commands: Vec<DrawIndexedIndirect>,
    buffer: Arc<dyn Buffer>,
    /// Commands the GPU buffer can hold
    capacity: u32,
    rebuilds: u64,
}

impl IndirectDrawTable {
    pub fn new(device: &dyn GraphicsDevice, label: &str, initial_capacity: u32) -> Result<Self> {
        let capacity = initial_capacity.max(1);
        Ok(Self {
            label: label.to_string(),
            commands: Vec::new(),
            buffer: Self::create_buffer(device, label, capacity)?,
            capacity,
            rebuilds: 0,
        })
    }

    fn create_buffer(device: &dyn GraphicsDevice, label: &str, capacity: u32) -> Result<Arc<dyn Buffer>> {
        device.create_buffer(BufferDesc {
            label: label.to_string(),
            size: capacity as u64 * DRAW_INDEXED_INDIRECT_STRIDE as u64,
            usage: BufferUsage::Indirect,
        })
    }

    /// Replace every command with one per subrange of the given live
    /// `(instance_slot, model)` pairs.
    pub fn rebuild<'a, I>(&mut self, instances: I)
    where
        I: IntoIterator<Item = (u32, &'a Model)>,
    {
        self.commands.clear();
        for (slot, model) in instances {
            for subrange in &model.subranges {
                self.commands.push(DrawIndexedIndirect {
                    index_count: subrange.index_count,
                    instance_count: 1,
                    first_index: subrange.first_index,
                    base_vertex: subrange.vertex_offset,
                    first_instance: pack_tag(slot, subrange.material_slot),
                });
            }
        }
        self.commands.radix_sort_unstable();
        self.rebuilds += 1;
        engine_trace!("zenith3d::IndirectDrawTable",
            "'{}' rebuilt with {} commands", self.label, self.commands.len());
    }

    /// Stage the commands into the GPU buffer, growing it when needed.
    pub fn upload(&mut self, device: &dyn GraphicsDevice, uploader: &mut StagedUploader) -> Result<()> {
        let needed = self.commands.len() as u32;
        if needed > self.capacity {
            let capacity = needed.next_power_of_two();
            engine_debug!("zenith3d::IndirectDrawTable",
                "Growing '{}' from {} to {} commands", self.label, self.capacity, capacity);
            self.buffer = Self::create_buffer(device, &self.label, capacity)?;
            self.capacity = capacity;
        }
        if !self.commands.is_empty() {
            uploader.stage(&self.buffer, 0, bytemuck::cast_slice(&self.commands))?;
        }
        Ok(())
    }

    pub fn commands(&self) -> &[DrawIndexedIndirect] {
        &self.commands
    }

    pub fn len(&self) -> u32 {
        self.commands.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of rebuilds since creation
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}

#[cfg(test)]
#[path = "indirect_table_tests.rs"]
mod tests;
