/// Scene → GPU synchronization.
///
/// The synchronizer owns one slot pool and one GPU array per entity
/// category. Each frame it drains the scene's population events, keeps
/// the shadow-caster pool in line with light flags, and stages exactly
/// one record per entity that changed since the previous sync.

use std::sync::Arc;
use bytemuck::Zeroable;
use rustc_hash::FxHashSet;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, Texture, BufferUsage};
use crate::scene::{
    Scene, SceneEvent, LightKey, ModelInstanceKey, InstanceCategory,
    TerrainKey, WaterKey,
};
use crate::utils::{SlotAllocator, SlotVisit};
use crate::{engine_debug, engine_warn};
use super::gpu_array::GpuArray;
use super::gpu_record::{GpuLight, GpuInstance, GpuTerrain, GpuWater};
use super::staged_uploader::StagedUploader;

/// Size in bytes of one bone matrix
const BONE_MATRIX_SIZE: u64 = 64;

/// Per-category outcome of one sync
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CategoryReport {
    pub added: u32,
    pub removed: u32,
    /// Entities that could not get a slot (pool full)
    pub dropped: u32,
    /// Records staged for upload
    pub uploaded: u32,
}

impl CategoryReport {
    pub fn population_changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Texture array a rebind targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureBinding {
    TerrainBlendMap,
    WaterNormalMap,
}

/// Texture attribute change, applied after the byte uploads
#[derive(Clone)]
pub struct TextureRebind {
    pub binding: TextureBinding,
    pub slot: u32,
    /// `None` binds the fallback texture
    pub texture: Option<Arc<dyn Texture>>,
}

#[derive(Default, Clone)]
pub struct SyncReport {
    pub lights: CategoryReport,
    pub static_instances: CategoryReport,
    pub animated_instances: CategoryReport,
    pub terrains: CategoryReport,
    pub waters: CategoryReport,
    pub casters: CategoryReport,
    /// Bone palettes staged
    pub bone_palettes: u32,
    pub rebinds: Vec<TextureRebind>,
}

impl SyncReport {
    /// Records staged across all categories (bone palettes included)
    pub fn uploaded(&self) -> u32 {
        self.lights.uploaded + self.static_instances.uploaded + self.animated_instances.uploaded
            + self.terrains.uploaded + self.waters.uploaded + self.bone_palettes
    }

    /// Entities dropped because their pool was full
    pub fn dropped(&self) -> u32 {
        self.lights.dropped + self.static_instances.dropped + self.animated_instances.dropped
            + self.terrains.dropped + self.waters.dropped + self.casters.dropped
    }
}

/// Keys added since the last sync, per category
#[derive(Default)]
struct Fresh {
    /// Every live entity is treated as fresh
    all: bool,
    lights: FxHashSet<LightKey>,
    instances: FxHashSet<ModelInstanceKey>,
    terrains: FxHashSet<TerrainKey>,
    waters: FxHashSet<WaterKey>,
    /// Light slots released since the last sync
    vacated_lights: Vec<u32>,
}

impl Fresh {
    fn light(&self, key: LightKey) -> bool {
        self.all || self.lights.contains(&key)
    }

    fn instance(&self, key: ModelInstanceKey) -> bool {
        self.all || self.instances.contains(&key)
    }

    fn terrain(&self, key: TerrainKey) -> bool {
        self.all || self.terrains.contains(&key)
    }

    fn water(&self, key: WaterKey) -> bool {
        self.all || self.waters.contains(&key)
    }
}

/// Add `key` to `pool`, counting a drop when the pool is full
fn admit<K>(pool: &mut SlotAllocator<K>, key: K, report: &mut CategoryReport, category: &str) -> bool
where
    K: Copy + Eq + std::hash::Hash + std::fmt::Debug,
{
    if pool.contains(key) {
        return false;
    }
    match pool.add(key) {
        Some(_) => {
            report.added += 1;
            true
        }
        None => {
            report.dropped += 1;
            engine_warn!("zenith3d::SceneSync",
                "{} pool full ({}), dropping {:?}", category, pool.capacity(), key);
            false
        }
    }
}

/// Free the slot of `key`, returning it
fn release<K>(pool: &mut SlotAllocator<K>, key: K, report: &mut CategoryReport) -> Option<u32>
where
    K: Copy + Eq + std::hash::Hash,
{
    let slot = pool.remove(key)?;
    report.removed += 1;
    Some(slot)
}

/// Remove live slots whose entity is gone, returning the freed slots
fn prune<K, F>(pool: &mut SlotAllocator<K>, report: &mut CategoryReport, exists: F) -> Vec<u32>
where
    K: Copy + Eq + std::hash::Hash,
    F: Fn(K) -> bool,
{
    let mut freed = Vec::new();
    pool.for_each(|slot, key| {
        if exists(key) {
            SlotVisit::Keep
        } else {
            report.removed += 1;
            freed.push(slot);
            SlotVisit::Remove
        }
    });
    freed
}

pub struct SceneSynchronizer {
    lights: SlotAllocator<LightKey>,
    static_instances: SlotAllocator<ModelInstanceKey>,
    animated_instances: SlotAllocator<ModelInstanceKey>,
    terrains: SlotAllocator<TerrainKey>,
    waters: SlotAllocator<WaterKey>,
    casters: SlotAllocator<LightKey>,
    /// Lights refused a caster slot; retried only once they stop asking
    rejected_casters: FxHashSet<LightKey>,
    light_array: GpuArray,
    static_array: GpuArray,
    animated_array: GpuArray,
    bone_array: GpuArray,
    terrain_array: GpuArray,
    water_array: GpuArray,
    max_bones: u32,
    /// Scene frame of the previous sync (0 = never synced)
    last_sync: u64,
    /// Next sync re-stages every live record
    resync_all: bool,
}

impl SceneSynchronizer {
    pub fn new(device: &dyn GraphicsDevice, config: &EngineConfig) -> Result<Self> {
        let caps = &config.capacities;
        Ok(Self {
            lights: SlotAllocator::new(caps.lights),
            static_instances: SlotAllocator::new(caps.static_instances),
            animated_instances: SlotAllocator::new(caps.animated_instances),
            terrains: SlotAllocator::new(caps.terrains),
            waters: SlotAllocator::new(caps.waters),
            casters: SlotAllocator::new(caps.shadow_casters),
            rejected_casters: FxHashSet::default(),
            light_array: GpuArray::of::<GpuLight>(device, "lights", caps.lights)?,
            static_array: GpuArray::of::<GpuInstance>(device, "static_instances", caps.static_instances)?,
            animated_array: GpuArray::of::<GpuInstance>(device, "animated_instances", caps.animated_instances)?,
            bone_array: GpuArray::with_stride(
                device,
                "bones",
                caps.animated_instances,
                config.max_bones as u64 * BONE_MATRIX_SIZE,
                BufferUsage::Storage,
            )?,
            terrain_array: GpuArray::of::<GpuTerrain>(device, "terrains", caps.terrains)?,
            water_array: GpuArray::of::<GpuWater>(device, "waters", caps.waters)?,
            max_bones: config.max_bones,
            last_sync: 0,
            resync_all: false,
        })
    }

    /// Bring every GPU array up to date with `scene`.
    pub fn sync(&mut self, scene: &mut Scene, uploader: &mut StagedUploader) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let mut fresh = self.apply_events(scene, &mut report);
        self.prune_stale(scene, &mut fresh, &mut report);
        if std::mem::take(&mut self.resync_all) {
            fresh.all = true;
            fresh.vacated_lights = (0..self.lights.high_water_mark())
                .filter(|&slot| self.lights.key_at(slot).is_none())
                .collect();
        }
        let forced = self.reconcile_casters(scene, &mut report);

        self.sync_lights(scene, uploader, &fresh, &forced, &mut report)?;
        self.sync_instances(scene, uploader, &fresh, &mut report)?;
        self.sync_terrains(scene, uploader, &fresh, &mut report)?;
        self.sync_waters(scene, uploader, &fresh, &mut report)?;

        self.last_sync = scene.frame();
        if report.uploaded() > 0 || report.dropped() > 0 {
            engine_debug!("zenith3d::SceneSync",
                "frame {}: {} records staged, {} dropped, {} rebinds",
                self.last_sync, report.uploaded(), report.dropped(), report.rebinds.len());
        }
        Ok(report)
    }

    /// Forget what the GPU is known to hold.
    ///
    /// Called when a frame's uploads never reached the GPU: the next sync
    /// stages every live record, bone palette and texture binding again
    /// and clears every free light slot.
    pub fn invalidate(&mut self) {
        self.resync_all = true;
    }

    // ===== POPULATION =====

    fn apply_events(&mut self, scene: &mut Scene, report: &mut SyncReport) -> Fresh {
        let mut fresh = Fresh::default();
        for event in scene.take_events() {
            match event {
                SceneEvent::LightAdded(key) => {
                    if scene.light(key).is_some()
                        && admit(&mut self.lights, key, &mut report.lights, "light")
                    {
                        fresh.lights.insert(key);
                    }
                }
                SceneEvent::LightRemoved(key) => {
                    if let Some(slot) = release(&mut self.lights, key, &mut report.lights) {
                        fresh.vacated_lights.push(slot);
                    }
                    fresh.lights.remove(&key);
                }
                SceneEvent::InstanceAdded(key, category) => {
                    if scene.instance(key).is_none() {
                        continue;
                    }
                    let admitted = match category {
                        InstanceCategory::Static => admit(
                            &mut self.static_instances, key, &mut report.static_instances, "static instance"),
                        InstanceCategory::Animated => admit(
                            &mut self.animated_instances, key, &mut report.animated_instances, "animated instance"),
                    };
                    if admitted {
                        fresh.instances.insert(key);
                    }
                }
                SceneEvent::InstanceRemoved(key, category) => {
                    match category {
                        InstanceCategory::Static => release(
                            &mut self.static_instances, key, &mut report.static_instances),
                        InstanceCategory::Animated => release(
                            &mut self.animated_instances, key, &mut report.animated_instances),
                    };
                    fresh.instances.remove(&key);
                }
                SceneEvent::TerrainAdded(key) => {
                    if scene.terrain(key).is_some()
                        && admit(&mut self.terrains, key, &mut report.terrains, "terrain")
                    {
                        fresh.terrains.insert(key);
                    }
                }
                SceneEvent::TerrainRemoved(key) => {
                    release(&mut self.terrains, key, &mut report.terrains);
                    fresh.terrains.remove(&key);
                }
                SceneEvent::WaterAdded(key) => {
                    if scene.water(key).is_some()
                        && admit(&mut self.waters, key, &mut report.waters, "water")
                    {
                        fresh.waters.insert(key);
                    }
                }
                SceneEvent::WaterRemoved(key) => {
                    release(&mut self.waters, key, &mut report.waters);
                    fresh.waters.remove(&key);
                }
            }
        }
        fresh
    }

    /// Drop slots whose entity disappeared without an event
    fn prune_stale(&mut self, scene: &Scene, fresh: &mut Fresh, report: &mut SyncReport) {
        let vacated = prune(&mut self.lights, &mut report.lights, |k| scene.light(k).is_some());
        fresh.vacated_lights.extend(vacated);
        prune(&mut self.static_instances, &mut report.static_instances, |k| scene.instance(k).is_some());
        prune(&mut self.animated_instances, &mut report.animated_instances, |k| scene.instance(k).is_some());
        prune(&mut self.terrains, &mut report.terrains, |k| scene.terrain(k).is_some());
        prune(&mut self.waters, &mut report.waters, |k| scene.water(k).is_some());
    }

    /// Make the caster pool match "enabled lights flagged CAST_SHADOW".
    ///
    /// A light refused for lack of a slot is not retried while it keeps
    /// asking; it becomes eligible again once it stops casting (flag
    /// cleared, disabled or removed).
    ///
    /// Returns the lights whose caster membership changed; their light
    /// record carries the caster slot and must be re-uploaded.
    fn reconcile_casters(&mut self, scene: &Scene, report: &mut SyncReport) -> FxHashSet<LightKey> {
        let mut forced = FxHashSet::default();
        let lights = &self.lights;
        let wants_caster = |key: LightKey| {
            lights.contains(key) && scene.light(key).is_some_and(|l| l.casts_shadow())
        };
        self.rejected_casters.retain(|&key| wants_caster(key));

        self.casters.for_each(|_, key| {
            if wants_caster(key) {
                SlotVisit::Keep
            } else {
                forced.insert(key);
                report.casters.removed += 1;
                SlotVisit::Remove
            }
        });

        let candidates: Vec<LightKey> = self.lights.iter()
            .map(|(_, key)| key)
            .filter(|&key| wants_caster(key) && !self.rejected_casters.contains(&key))
            .collect();
        for key in candidates {
            if self.casters.contains(key) {
                continue;
            }
            if admit(&mut self.casters, key, &mut report.casters, "shadow caster") {
                forced.insert(key);
            } else {
                self.rejected_casters.insert(key);
            }
        }
        forced
    }

    // ===== RECORD UPLOADS =====

    fn is_dirty(&self, stamp: u64, node_stamp: u64) -> bool {
        stamp.max(node_stamp) > self.last_sync
    }

    fn sync_lights(
        &mut self,
        scene: &Scene,
        uploader: &mut StagedUploader,
        fresh: &Fresh,
        forced: &FxHashSet<LightKey>,
        report: &mut SyncReport,
    ) -> Result<()> {
        for (slot, key) in self.lights.iter() {
            let Some(light) = scene.light(key) else { continue };
            let dirty = fresh.light(key)
                || forced.contains(&key)
                || self.is_dirty(light.changed_at(), scene.node_moved_at(light.node));
            if !dirty {
                continue;
            }
            let record = GpuLight::new(
                light,
                scene.light_position(light),
                scene.light_direction(light),
                self.casters.slot_of(key),
            );
            self.light_array.stage(uploader, slot, &record)?;
            report.lights.uploaded += 1;
        }

        // Free slots below the high-water mark must hold a disabled record
        for &slot in &fresh.vacated_lights {
            if self.lights.key_at(slot).is_none() {
                self.light_array.stage(uploader, slot, &GpuLight::zeroed())?;
                report.lights.uploaded += 1;
            }
        }
        Ok(())
    }

    fn sync_instances(
        &mut self,
        scene: &mut Scene,
        uploader: &mut StagedUploader,
        fresh: &Fresh,
        report: &mut SyncReport,
    ) -> Result<()> {
        let static_live: Vec<(u32, ModelInstanceKey)> = self.static_instances.iter().collect();
        for (slot, key) in static_live {
            let Some(instance) = scene.instance(key) else { continue };
            let dirty = fresh.instance(key)
                || self.is_dirty(instance.changed_at(), scene.node_moved_at(instance.node));
            if dirty {
                let record = GpuInstance::new(scene.world_matrix(instance.node), instance.visible, None);
                self.static_array.stage(uploader, slot, &record)?;
                report.static_instances.uploaded += 1;
            }
        }

        let animated_live: Vec<(u32, ModelInstanceKey)> = self.animated_instances.iter().collect();
        for (slot, key) in animated_live {
            let Some(instance) = scene.instance(key) else { continue };
            let is_fresh = fresh.instance(key);
            if is_fresh || self.is_dirty(instance.changed_at(), scene.node_moved_at(instance.node)) {
                let bone_offset = slot * self.max_bones;
                let record = GpuInstance::new(scene.world_matrix(instance.node), instance.visible, Some(bone_offset));
                self.animated_array.stage(uploader, slot, &record)?;
                report.animated_instances.uploaded += 1;
            }

            let Some(instance) = scene.instance_mut(key) else { continue };
            if instance.take_bones_changed() || is_fresh {
                let bones = instance.bones().unwrap_or(&[]);
                if bones.len() > self.max_bones as usize {
                    engine_warn!("zenith3d::SceneSync",
                        "bone palette of '{}' has {} bones, truncated to {}",
                        instance.model().label, bones.len(), self.max_bones);
                }
                let count = bones.len().min(self.max_bones as usize);
                if count > 0 {
                    self.bone_array.stage_bytes(uploader, slot, bytemuck::cast_slice(&bones[..count]))?;
                    report.bone_palettes += 1;
                }
            }
        }
        Ok(())
    }

    fn sync_terrains(
        &mut self,
        scene: &mut Scene,
        uploader: &mut StagedUploader,
        fresh: &Fresh,
        report: &mut SyncReport,
    ) -> Result<()> {
        let live: Vec<(u32, TerrainKey)> = self.terrains.iter().collect();
        for (slot, key) in live {
            let last_sync = self.last_sync;
            let Some(terrain) = scene.terrain_mut(key) else { continue };
            let is_fresh = fresh.terrain(key);
            if is_fresh || terrain.changed_at() > last_sync {
                self.terrain_array.stage(uploader, slot, &GpuTerrain::from(&*terrain))?;
                report.terrains.uploaded += 1;
            }
            if terrain.take_blend_map_changed() || is_fresh {
                report.rebinds.push(TextureRebind {
                    binding: TextureBinding::TerrainBlendMap,
                    slot,
                    texture: terrain.blend_map().cloned(),
                });
            }
        }
        Ok(())
    }

    fn sync_waters(
        &mut self,
        scene: &mut Scene,
        uploader: &mut StagedUploader,
        fresh: &Fresh,
        report: &mut SyncReport,
    ) -> Result<()> {
        let live: Vec<(u32, WaterKey)> = self.waters.iter().collect();
        for (slot, key) in live {
            let last_sync = self.last_sync;
            let Some(water) = scene.water_mut(key) else { continue };
            let is_fresh = fresh.water(key);
            if is_fresh || water.changed_at() > last_sync {
                self.water_array.stage(uploader, slot, &GpuWater::from(&*water))?;
                report.waters.uploaded += 1;
            }
            if water.take_normal_map_changed() || is_fresh {
                report.rebinds.push(TextureRebind {
                    binding: TextureBinding::WaterNormalMap,
                    slot,
                    texture: water.normal_map().cloned(),
                });
            }
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn lights(&self) -> &SlotAllocator<LightKey> {
        &self.lights
    }

    pub fn static_instances(&self) -> &SlotAllocator<ModelInstanceKey> {
        &self.static_instances
    }

    pub fn animated_instances(&self) -> &SlotAllocator<ModelInstanceKey> {
        &self.animated_instances
    }

    pub fn terrains(&self) -> &SlotAllocator<TerrainKey> {
        &self.terrains
    }

    pub fn waters(&self) -> &SlotAllocator<WaterKey> {
        &self.waters
    }

    pub fn casters(&self) -> &SlotAllocator<LightKey> {
        &self.casters
    }

    /// Lights currently refused a caster slot
    pub fn rejected_casters(&self) -> &FxHashSet<LightKey> {
        &self.rejected_casters
    }

    pub fn light_array(&self) -> &GpuArray {
        &self.light_array
    }

    pub fn static_array(&self) -> &GpuArray {
        &self.static_array
    }

    pub fn animated_array(&self) -> &GpuArray {
        &self.animated_array
    }

    pub fn bone_array(&self) -> &GpuArray {
        &self.bone_array
    }

    pub fn terrain_array(&self) -> &GpuArray {
        &self.terrain_array
    }

    pub fn water_array(&self) -> &GpuArray {
        &self.water_array
    }

    /// Scene frame of the previous sync
    pub fn last_sync(&self) -> u64 {
        self.last_sync
    }
}

#[cfg(test)]
#[path = "scene_sync_tests.rs"]
mod tests;
