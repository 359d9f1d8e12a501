//! Render passes
//!
//! Each pass owns its pipelines, binding groups and render targets, and
//! records into a caller-provided command list. The frame orchestrator
//! (`RenderEngine`) decides when each pass runs and places the barriers
//! between them.

mod environment;
mod shadow;
mod geometry;
mod lighting;
mod compose;

pub use environment::{EnvironmentUpdater, EnvironmentState, SkyPushConstants, ConvolvePushConstants};
pub use shadow::{
    ShadowPass, ShadowPushConstants, directional_matrix, spot_matrix, point_matrices,
};
pub use geometry::{GeometryPass, GeometryBuffers, GBuffer, GeometryStats};
pub use lighting::{LightingPass, LightingPushConstants};
pub use compose::{ComposePass, ComposePushConstants};

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Attachment, BindingGroup, CommandList, Pipeline, Rect2D, RenderPassDesc, Viewport,
    ShaderStage,
};

/// Both stages see every push constant block
pub(crate) const ALL_STAGES: &[ShaderStage] = &[ShaderStage::Vertex, ShaderStage::Fragment];

/// Begin a render pass and cover the whole first attachment with the
/// viewport and scissor.
pub(crate) fn begin_pass(
    cmd: &mut dyn CommandList,
    label: &str,
    color_attachments: Vec<Attachment>,
    depth_attachment: Option<Attachment>,
) -> Result<()> {
    let (width, height) = color_attachments.first()
        .or(depth_attachment.as_ref())
        .map(Attachment::extent)
        .unwrap_or((1, 1));
    cmd.begin_render_pass(&RenderPassDesc {
        label: label.to_string(),
        color_attachments,
        depth_attachment,
    })?;
    cmd.set_viewport(Viewport::full(width, height))?;
    cmd.set_scissor(Rect2D { x: 0, y: 0, width, height })
}

/// Bind a pipeline with its groups (set index = position) and draw a
/// fullscreen triangle.
pub(crate) fn draw_fullscreen(
    cmd: &mut dyn CommandList,
    pipeline: &Arc<dyn Pipeline>,
    groups: &[&Arc<dyn BindingGroup>],
    push_constants: Option<&[u8]>,
) -> Result<()> {
    cmd.bind_pipeline(pipeline)?;
    for (set_index, group) in groups.iter().enumerate() {
        cmd.bind_binding_group(pipeline, set_index as u32, group)?;
    }
    if let Some(data) = push_constants {
        cmd.push_constants(ALL_STAGES, 0, data)?;
    }
    cmd.draw(3, 1, 0, 0)
}
