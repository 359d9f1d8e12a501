//! Scene → GPU synchronization: record layouts, GPU arrays, staged
//! uploads and the per-frame dirty tracking engine.

mod gpu_record;
mod gpu_array;
mod staged_uploader;
mod scene_sync;

pub use gpu_record::{
    GpuLight, GpuInstance, GpuTerrain, GpuWater, GpuShadowMatrices, GpuCamera,
    NO_SHADOW_SLOT, NO_BONES, INSTANCE_FLAG_VISIBLE, INSTANCE_FLAG_SKINNED,
};
pub use gpu_array::GpuArray;
pub use staged_uploader::{StagedUploader, CopyRange, FlushStats};
pub use scene_sync::{
    SceneSynchronizer, SyncReport, CategoryReport, TextureRebind, TextureBinding,
};
