/// Scene: arena of transform nodes and renderable entities.
///
/// Every entity category is stored in its own SlotMap with stable keys.
/// Mutations go through the scene so it can stamp them with the current
/// frame counter and queue population events; the renderer never holds
/// more than keys.

use glam::{Mat4, Vec3, Vec4Swizzles};
use slotmap::SlotMap;
use crate::error::{Error, Result};
use crate::engine_debug;
use super::node::{Node, NodeKey};
use super::light::{Light, LightKey};
use super::model_instance::{ModelInstance, ModelInstanceKey, InstanceCategory};
use super::terrain::{Terrain, TerrainKey};
use super::water::{Water, WaterKey};
use super::sky::{SkyVariant, Fog};

/// Population change queued for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    LightAdded(LightKey),
    LightRemoved(LightKey),
    InstanceAdded(ModelInstanceKey, InstanceCategory),
    InstanceRemoved(ModelInstanceKey, InstanceCategory),
    TerrainAdded(TerrainKey),
    TerrainRemoved(TerrainKey),
    WaterAdded(WaterKey),
    WaterRemoved(WaterKey),
}

pub struct Scene {
    nodes: SlotMap<NodeKey, Node>,
    lights: SlotMap<LightKey, Light>,
    instances: SlotMap<ModelInstanceKey, ModelInstance>,
    terrains: SlotMap<TerrainKey, Terrain>,
    waters: SlotMap<WaterKey, Water>,
    sky: SkyVariant,
    sky_dirty: bool,
    ambient: Vec3,
    fog: Fog,
    sun: Option<LightKey>,
    /// Stamp given to every mutation until the next `advance_frame`
    frame: u64,
    events: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

fn missing<K: std::fmt::Debug>(what: &str, key: K) -> Error {
    Error::InvalidResource(format!("{} {:?} not found in scene", what, key))
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            lights: SlotMap::with_key(),
            instances: SlotMap::with_key(),
            terrains: SlotMap::with_key(),
            waters: SlotMap::with_key(),
            sky: SkyVariant::None,
            sky_dirty: true,
            ambient: Vec3::splat(0.03),
            fog: Fog::default(),
            sun: None,
            frame: 1,
            events: Vec::new(),
        }
    }

    // ===== FRAME COUNTER =====

    /// Current frame stamp (starts at 1; 0 means "never")
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Start a new frame: later mutations stamp strictly newer values
    pub fn advance_frame(&mut self) {
        self.frame += 1;
    }

    // ===== NODES =====

    /// Create a node under `parent` (or as a root)
    pub fn create_node(&mut self, local: Mat4, parent: Option<NodeKey>) -> Result<NodeKey> {
        if let Some(p) = parent {
            if !self.nodes.contains_key(p) {
                return Err(missing("parent node", p));
            }
        }
        let key = self.nodes.insert(Node::new(local, parent, self.frame));
        if let Some(p) = parent {
            self.nodes[p].children.push(key);
        }
        self.propagate(key);
        Ok(key)
    }

    /// Remove a node; its children are re-attached to its parent.
    ///
    /// Entities still referencing the node fall back to an identity transform.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<()> {
        let node = self.nodes.remove(key).ok_or_else(|| missing("node", key))?;
        if let Some(p) = node.parent.and_then(|p| self.nodes.get_mut(p)) {
            p.children.retain(|&c| c != key);
            p.children.extend_from_slice(&node.children);
        }
        for &child in &node.children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = node.parent;
            }
            self.propagate(child);
        }

        let frame = self.frame;
        for (light_key, light) in self.lights.iter_mut().filter(|(_, l)| l.node == key) {
            light.changed_at = frame;
            if self.sun == Some(light_key) {
                self.sky_dirty = true;
            }
        }
        for (_, instance) in self.instances.iter_mut().filter(|(_, i)| i.node == key) {
            instance.changed_at = frame;
        }
        Ok(())
    }

    /// Re-parent `child`. Fails when `parent` is `child` or one of its descendants.
    pub fn set_parent(&mut self, child: NodeKey, parent: Option<NodeKey>) -> Result<()> {
        if !self.nodes.contains_key(child) {
            return Err(missing("node", child));
        }
        if let Some(p) = parent {
            if !self.nodes.contains_key(p) {
                return Err(missing("parent node", p));
            }
            let mut cursor = Some(p);
            while let Some(current) = cursor {
                if current == child {
                    return Err(Error::InvalidResource(format!(
                        "re-parenting {:?} under {:?} would create a cycle", child, p)));
                }
                cursor = self.nodes[current].parent;
            }
        }

        if let Some(old) = self.nodes[child].parent {
            self.nodes[old].children.retain(|&c| c != child);
        }
        if let Some(p) = parent {
            self.nodes[p].children.push(child);
        }
        self.nodes[child].parent = parent;
        self.propagate(child);
        Ok(())
    }

    pub fn set_local_transform(&mut self, key: NodeKey, local: Mat4) -> Result<()> {
        let node = self.nodes.get_mut(key).ok_or_else(|| missing("node", key))?;
        node.local = local;
        self.propagate(key);
        Ok(())
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// World matrix of `key`, identity for a removed node
    pub fn world_matrix(&self, key: NodeKey) -> Mat4 {
        self.nodes.get(key).map_or(Mat4::IDENTITY, |n| n.world)
    }

    /// Frame at which `key` last moved, 0 for a removed node
    pub fn node_moved_at(&self, key: NodeKey) -> u64 {
        self.nodes.get(key).map_or(0, |n| n.moved_at)
    }

    /// Recompute world matrices of `root`'s subtree and stamp it
    fn propagate(&mut self, root: NodeKey) {
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            let parent_world = self.nodes[key].parent
                .and_then(|p| self.nodes.get(p))
                .map_or(Mat4::IDENTITY, |p| p.world);
            let node = &mut self.nodes[key];
            node.world = parent_world * node.local;
            node.moved_at = self.frame;
            stack.extend_from_slice(&node.children);
        }

        let sun_moved = self.sun
            .and_then(|s| self.lights.get(s))
            .is_some_and(|light| self.node_moved_at(light.node) == self.frame);
        if sun_moved {
            self.sky_dirty = true;
        }
    }

    // ===== LIGHTS =====

    pub fn add_light(&mut self, mut light: Light) -> LightKey {
        light.changed_at = self.frame;
        let key = self.lights.insert(light);
        self.events.push(SceneEvent::LightAdded(key));
        key
    }

    pub fn remove_light(&mut self, key: LightKey) -> Option<Light> {
        let light = self.lights.remove(key)?;
        self.events.push(SceneEvent::LightRemoved(key));
        if self.sun == Some(key) {
            self.sun = None;
            self.sky_dirty = true;
        }
        Some(light)
    }

    /// Mutate a light and stamp it
    pub fn modify_light<F: FnOnce(&mut Light)>(&mut self, key: LightKey, f: F) -> Result<()> {
        let light = self.lights.get_mut(key).ok_or_else(|| missing("light", key))?;
        f(light);
        light.changed_at = self.frame;
        if self.sun == Some(key) {
            self.sky_dirty = true;
        }
        Ok(())
    }

    pub fn light(&self, key: LightKey) -> Option<&Light> {
        self.lights.get(key)
    }

    pub fn lights(&self) -> impl Iterator<Item = (LightKey, &Light)> {
        self.lights.iter()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// World-space position of a light's node
    pub fn light_position(&self, light: &Light) -> Vec3 {
        self.world_matrix(light.node).w_axis.xyz()
    }

    /// World-space direction a light points to (node -Z axis)
    pub fn light_direction(&self, light: &Light) -> Vec3 {
        (-self.world_matrix(light.node).z_axis.xyz()).normalize_or(Vec3::NEG_Z)
    }

    // ===== MODEL INSTANCES =====

    pub fn add_instance(&mut self, mut instance: ModelInstance) -> ModelInstanceKey {
        instance.changed_at = self.frame;
        let category = instance.category();
        let key = self.instances.insert(instance);
        self.events.push(SceneEvent::InstanceAdded(key, category));
        key
    }

    pub fn remove_instance(&mut self, key: ModelInstanceKey) -> Option<ModelInstance> {
        let instance = self.instances.remove(key)?;
        self.events.push(SceneEvent::InstanceRemoved(key, instance.category()));
        Some(instance)
    }

    /// Mutate an instance and stamp it
    pub fn modify_instance<F, R>(&mut self, key: ModelInstanceKey, f: F) -> Result<R>
    where
        F: FnOnce(&mut ModelInstance) -> R,
    {
        let instance = self.instances.get_mut(key).ok_or_else(|| missing("instance", key))?;
        let result = f(instance);
        instance.changed_at = self.frame;
        Ok(result)
    }

    pub fn instance(&self, key: ModelInstanceKey) -> Option<&ModelInstance> {
        self.instances.get(key)
    }

    pub(crate) fn instance_mut(&mut self, key: ModelInstanceKey) -> Option<&mut ModelInstance> {
        self.instances.get_mut(key)
    }

    pub fn instances(&self) -> impl Iterator<Item = (ModelInstanceKey, &ModelInstance)> {
        self.instances.iter()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    // ===== TERRAIN =====

    pub fn add_terrain(&mut self, mut terrain: Terrain) -> TerrainKey {
        terrain.changed_at = self.frame;
        let key = self.terrains.insert(terrain);
        self.events.push(SceneEvent::TerrainAdded(key));
        key
    }

    pub fn remove_terrain(&mut self, key: TerrainKey) -> Option<Terrain> {
        let terrain = self.terrains.remove(key)?;
        self.events.push(SceneEvent::TerrainRemoved(key));
        Some(terrain)
    }

    pub fn modify_terrain<F: FnOnce(&mut Terrain)>(&mut self, key: TerrainKey, f: F) -> Result<()> {
        let terrain = self.terrains.get_mut(key).ok_or_else(|| missing("terrain", key))?;
        f(terrain);
        terrain.changed_at = self.frame;
        Ok(())
    }

    pub fn terrain(&self, key: TerrainKey) -> Option<&Terrain> {
        self.terrains.get(key)
    }

    pub(crate) fn terrain_mut(&mut self, key: TerrainKey) -> Option<&mut Terrain> {
        self.terrains.get_mut(key)
    }

    pub fn terrain_count(&self) -> usize {
        self.terrains.len()
    }

    // ===== WATER =====

    pub fn add_water(&mut self, mut water: Water) -> WaterKey {
        water.changed_at = self.frame;
        let key = self.waters.insert(water);
        self.events.push(SceneEvent::WaterAdded(key));
        key
    }

    pub fn remove_water(&mut self, key: WaterKey) -> Option<Water> {
        let water = self.waters.remove(key)?;
        self.events.push(SceneEvent::WaterRemoved(key));
        Some(water)
    }

    pub fn modify_water<F: FnOnce(&mut Water)>(&mut self, key: WaterKey, f: F) -> Result<()> {
        let water = self.waters.get_mut(key).ok_or_else(|| missing("water", key))?;
        f(water);
        water.changed_at = self.frame;
        Ok(())
    }

    pub fn water(&self, key: WaterKey) -> Option<&Water> {
        self.waters.get(key)
    }

    pub(crate) fn water_mut(&mut self, key: WaterKey) -> Option<&mut Water> {
        self.waters.get_mut(key)
    }

    pub fn water_count(&self) -> usize {
        self.waters.len()
    }

    // ===== SKY / ATMOSPHERE =====

    pub fn sky(&self) -> &SkyVariant {
        &self.sky
    }

    pub fn set_sky(&mut self, sky: SkyVariant) {
        engine_debug!("zenith3d::Scene", "sky set to {}", sky.name());
        self.sky = sky;
        self.sky_dirty = true;
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn set_ambient(&mut self, ambient: Vec3) {
        self.ambient = ambient;
        self.sky_dirty = true;
    }

    pub fn fog(&self) -> &Fog {
        &self.fog
    }

    pub fn set_fog(&mut self, fog: Fog) {
        self.fog = fog;
    }

    /// Light driving the procedural sky
    pub fn sun(&self) -> Option<LightKey> {
        self.sun
    }

    pub fn set_sun(&mut self, sun: Option<LightKey>) -> Result<()> {
        if let Some(key) = sun {
            if !self.lights.contains_key(key) {
                return Err(missing("light", key));
            }
        }
        self.sun = sun;
        self.sky_dirty = true;
        Ok(())
    }

    /// Direction towards which the sun shines (straight down without a sun)
    pub fn sun_direction(&self) -> Vec3 {
        self.sun
            .and_then(|key| self.lights.get(key))
            .map_or(Vec3::NEG_Y, |light| self.light_direction(light))
    }

    pub fn is_sky_dirty(&self) -> bool {
        self.sky_dirty
    }

    pub fn mark_sky_dirty(&mut self) {
        self.sky_dirty = true;
    }

    pub(crate) fn clear_sky_dirty(&mut self) {
        self.sky_dirty = false;
    }

    // ===== EVENTS =====

    /// Pending population events
    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub(crate) fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    /// Remove every entity and node (removal events are queued)
    pub fn clear(&mut self) {
        let lights: Vec<_> = self.lights.keys().collect();
        for key in lights {
            self.remove_light(key);
        }
        let instances: Vec<_> = self.instances.keys().collect();
        for key in instances {
            self.remove_instance(key);
        }
        let terrains: Vec<_> = self.terrains.keys().collect();
        for key in terrains {
            self.remove_terrain(key);
        }
        let waters: Vec<_> = self.waters.keys().collect();
        for key in waters {
            self.remove_water(key);
        }
        self.nodes.clear();
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
