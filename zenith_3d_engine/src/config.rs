/// Engine configuration: construction-time constants.
///
/// Capacities, environment and shadow resolutions are fixed once the
/// `RenderEngine` is built; they are not runtime-reconfigurable.

use crate::error::{Error, Result};

/// Largest instance capacity the indirect tag can address (16 bits)
pub const MAX_TAGGED_INSTANCES: u32 = 1 << 16;

/// Per-category pool capacities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    pub lights: u32,
    pub static_instances: u32,
    pub animated_instances: u32,
    pub terrains: u32,
    pub waters: u32,
    pub shadow_casters: u32,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            lights: 256,
            static_instances: 4096,
            animated_instances: 256,
            terrains: 16,
            waters: 8,
            shadow_casters: 4,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pool capacity per entity category
    pub capacities: Capacities,
    /// Height of environment mip 0 (width is twice this, equirectangular)
    pub environment_resolution: u32,
    /// Requested environment mip count (clamped to the full chain)
    pub environment_mip_levels: u32,
    /// Edge length of one shadow atlas slice
    pub shadow_atlas_resolution: u32,
    /// Exponent used for exponential shadow maps
    pub esm_exponent: f32,
    /// Bone matrices reserved per animated instance
    pub max_bones: u32,
    /// Size of the G-buffer and lit buffer
    pub render_width: u32,
    pub render_height: u32,
    /// Exposure applied by the compose pass
    pub exposure: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacities: Capacities::default(),
            environment_resolution: 256,
            environment_mip_levels: 6,
            shadow_atlas_resolution: 2048,
            esm_exponent: 80.0,
            max_bones: 64,
            render_width: 1280,
            render_height: 720,
            exposure: 1.0,
        }
    }
}

impl EngineConfig {
    /// Check every constraint the engine relies on.
    pub fn validate(&self) -> Result<()> {
        let caps = &self.capacities;
        let named = [
            ("lights", caps.lights),
            ("static_instances", caps.static_instances),
            ("animated_instances", caps.animated_instances),
            ("terrains", caps.terrains),
            ("waters", caps.waters),
            ("shadow_casters", caps.shadow_casters),
        ];
        for (name, value) in named {
            if value == 0 {
                return Err(Error::InitializationFailed(
                    format!("capacity '{}' must be greater than zero", name)));
            }
        }
        if caps.static_instances > MAX_TAGGED_INSTANCES
            || caps.animated_instances > MAX_TAGGED_INSTANCES
        {
            return Err(Error::InitializationFailed(format!(
                "instance capacities are limited to {} by draw tag packing",
                MAX_TAGGED_INSTANCES)));
        }
        if !self.environment_resolution.is_power_of_two() {
            return Err(Error::InitializationFailed(format!(
                "environment resolution {} is not a power of two",
                self.environment_resolution)));
        }
        if !self.shadow_atlas_resolution.is_power_of_two() {
            return Err(Error::InitializationFailed(format!(
                "shadow atlas resolution {} is not a power of two",
                self.shadow_atlas_resolution)));
        }
        if self.environment_mip_levels == 0 {
            return Err(Error::InitializationFailed(
                "environment needs at least one mip level".to_string()));
        }
        if self.max_bones == 0 {
            return Err(Error::InitializationFailed("max_bones must be greater than zero".to_string()));
        }
        if self.render_width == 0 || self.render_height == 0 {
            return Err(Error::InitializationFailed(format!(
                "invalid render size {}x{}", self.render_width, self.render_height)));
        }
        Ok(())
    }

    /// Number of environment mips actually allocated
    pub fn environment_mip_count(&self) -> u32 {
        let full_chain = self.environment_resolution.trailing_zeros() + 1;
        self.environment_mip_levels.min(full_chain)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
