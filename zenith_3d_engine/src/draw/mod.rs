//! Indirect draw tables for instanced geometry.

mod indirect_table;

pub use indirect_table::{
    IndirectDrawTable, DrawIndexedIndirect, pack_tag, unpack_tag,
};
