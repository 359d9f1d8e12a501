/// Model instances: shared geometry placed in the scene.

use std::sync::Arc;
use glam::Mat4;
use slotmap::new_key_type;
use crate::error::{Error, Result};
use super::node::NodeKey;

new_key_type! {
    /// Stable key for a ModelInstance within a Scene.
    pub struct ModelInstanceKey;
}

/// A contiguous index range of the shared geometry buffers drawn with
/// one material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySubrange {
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub material_slot: u16,
}

/// Geometry shared between instances
#[derive(Debug, Clone)]
pub struct Model {
    pub label: String,
    pub subranges: Vec<GeometrySubrange>,
    /// Vertices carry joint indices and weights
    pub skinned: bool,
}

impl Model {
    pub fn new(label: &str, subranges: Vec<GeometrySubrange>) -> Self {
        Self { label: label.to_string(), subranges, skinned: false }
    }

    pub fn skinned(label: &str, subranges: Vec<GeometrySubrange>) -> Self {
        Self { label: label.to_string(), subranges, skinned: true }
    }
}

/// Pool an instance belongs to, fixed when it is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceCategory {
    Static,
    Animated,
}

#[derive(Debug, Clone)]
pub struct ModelInstance {
    pub node: NodeKey,
    model: Arc<Model>,
    pub visible: bool,
    bones: Option<Vec<Mat4>>,
    bones_changed: bool,
    pub(crate) changed_at: u64,
}

impl ModelInstance {
    /// Instance of a rigid model
    pub fn new(node: NodeKey, model: Arc<Model>) -> Self {
        Self {
            node,
            model,
            visible: true,
            bones: None,
            bones_changed: false,
            changed_at: 0,
        }
    }

    /// Instance carrying a bone palette; starts at bind pose (identity)
    pub fn animated(node: NodeKey, model: Arc<Model>, bone_count: usize) -> Self {
        Self {
            bones: Some(vec![Mat4::IDENTITY; bone_count]),
            bones_changed: true,
            ..Self::new(node, model)
        }
    }

    /// Model drawn by this instance; fixed for the instance's lifetime
    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn category(&self) -> InstanceCategory {
        if self.bones.is_some() {
            InstanceCategory::Animated
        } else {
            InstanceCategory::Static
        }
    }

    pub fn bones(&self) -> Option<&[Mat4]> {
        self.bones.as_deref()
    }

    /// Replace the bone palette of an animated instance
    pub fn set_bones(&mut self, palette: &[Mat4]) -> Result<()> {
        match self.bones.as_mut() {
            Some(bones) => {
                bones.clear();
                bones.extend_from_slice(palette);
                self.bones_changed = true;
                Ok(())
            }
            None => Err(Error::InvalidResource(format!(
                "instance of '{}' has no bone palette", self.model.label))),
        }
    }

    pub fn bones_changed(&self) -> bool {
        self.bones_changed
    }

    pub(crate) fn take_bones_changed(&mut self) -> bool {
        std::mem::take(&mut self.bones_changed)
    }

    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }
}
