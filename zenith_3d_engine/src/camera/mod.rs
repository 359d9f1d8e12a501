//! Camera module: view/projection container and frustum helpers.
//!
//! The engine does NOT own cameras. The caller builds one per frame
//! (or keeps one around) and hands it to `RenderEngine::render_frame`.

mod camera;
mod frustum;

pub use camera::Camera;
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
