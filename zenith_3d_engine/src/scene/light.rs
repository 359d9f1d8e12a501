/// Light entities.

use bitflags::bitflags;
use glam::Vec3;
use slotmap::new_key_type;
use super::node::NodeKey;

new_key_type! {
    /// Stable key for a Light within a Scene.
    pub struct LightKey;
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct LightFlags: u32 {
        const ENABLED     = 1 << 0;
        const CAST_SHADOW = 1 << 1;
    }
}

impl Default for LightFlags {
    fn default() -> Self {
        LightFlags::ENABLED
    }
}

/// Light shape. Direction comes from the node's -Z axis, position from
/// its translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point { range: f32 },
    /// Angles are half-angles in radians, `inner_angle <= outer_angle`
    Spot { range: f32, inner_angle: f32, outer_angle: f32 },
}

impl LightKind {
    /// Discriminant written into the GPU light record
    pub fn type_id(&self) -> u32 {
        match self {
            LightKind::Directional => 0,
            LightKind::Point { .. } => 1,
            LightKind::Spot { .. } => 2,
        }
    }

    /// Attenuation range (infinite for directional lights)
    pub fn range(&self) -> f32 {
        match self {
            LightKind::Directional => f32::INFINITY,
            LightKind::Point { range } | LightKind::Spot { range, .. } => *range,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Light {
    pub node: NodeKey,
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub flags: LightFlags,
    pub(crate) changed_at: u64,
}

impl Light {
    pub fn new(node: NodeKey, kind: LightKind) -> Self {
        Self {
            node,
            kind,
            color: Vec3::ONE,
            intensity: 1.0,
            flags: LightFlags::default(),
            changed_at: 0,
        }
    }

    pub fn with_color(mut self, color: Vec3, intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    pub fn with_flags(mut self, flags: LightFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.contains(LightFlags::ENABLED)
    }

    /// Enabled and flagged as a shadow caster
    pub fn casts_shadow(&self) -> bool {
        self.flags.contains(LightFlags::ENABLED | LightFlags::CAST_SHADOW)
    }

    /// Scene frame of the last attribute change
    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }
}
