//! Scene module
//!
//! Arena-backed scene graph: transform nodes plus lights, model instances,
//! terrain and water patches, and the sky/atmosphere description.

mod node;
mod light;
mod model_instance;
mod terrain;
mod water;
mod sky;
mod scene;

pub use node::{Node, NodeKey};
pub use light::{Light, LightKey, LightKind, LightFlags};
pub use model_instance::{
    ModelInstance, ModelInstanceKey, Model, GeometrySubrange, InstanceCategory,
};
pub use terrain::{Terrain, TerrainKey};
pub use water::{Water, WaterKey};
pub use sky::{SkyVariant, Fog};
pub use scene::{Scene, SceneEvent};
