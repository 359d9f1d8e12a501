/// Compose pass: exposure-scaled copy of the lit buffer into the
/// caller's destination image.
///
/// Pipelines are specialised per destination format and created the
/// first time a format is seen.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureFormat, Pipeline, PipelineDesc, VertexInput, CullMode,
    BindingGroup, BindingResource, CommandList, Attachment, LoadOp,
};
use crate::{engine_bail, engine_debug};
use super::{begin_pass, draw_fullscreen};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ComposePushConstants {
    pub exposure: f32,
    pub _pad: [f32; 3],
}

/// Pipeline and lit-buffer binding for one destination format
struct ComposeVariant {
    pipeline: Arc<dyn Pipeline>,
    group: Option<Arc<dyn BindingGroup>>,
}

#[derive(Default)]
pub struct ComposePass {
    variants: FxHashMap<TextureFormat, ComposeVariant>,
}

impl ComposePass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop lit-buffer bindings (the lit target was recreated)
    pub fn invalidate(&mut self) {
        for variant in self.variants.values_mut() {
            variant.group = None;
        }
    }

    fn variant(
        &mut self,
        device: &dyn GraphicsDevice,
        format: TextureFormat,
        lit: &Arc<dyn Texture>,
    ) -> Result<(Arc<dyn Pipeline>, Arc<dyn BindingGroup>)> {
        let variant = match self.variants.entry(format) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let pipeline = device.create_pipeline(PipelineDesc {
                    program: "compose".to_string(),
                    vertex_input: VertexInput::None,
                    color_formats: vec![format],
                    depth_format: None,
                    depth_test: false,
                    cull_mode: CullMode::None,
                    push_constant_size: std::mem::size_of::<ComposePushConstants>() as u32,
                })?;
                engine_debug!("zenith3d::Compose", "Created compose pipeline for {:?}", format);
                entry.insert(ComposeVariant { pipeline, group: None })
            }
        };
        let group = match variant.group.clone() {
            Some(group) => group,
            None => {
                let group = device.create_binding_group(
                    &variant.pipeline, 0, &[BindingResource::SampledTexture(lit.as_ref())])?;
                variant.group = Some(Arc::clone(&group));
                group
            }
        };
        Ok((Arc::clone(&variant.pipeline), group))
    }

    /// Write `lit` scaled by `exposure` into `destination`.
    pub fn record(
        &mut self,
        device: &dyn GraphicsDevice,
        cmd: &mut dyn CommandList,
        lit: &Arc<dyn Texture>,
        destination: &Arc<dyn Texture>,
        exposure: f32,
    ) -> Result<()> {
        let format = destination.info().format;
        if format.is_depth() {
            engine_bail!("zenith3d::Compose",
                "destination '{}' has depth format {:?}", destination.label(), format);
        }
        let (pipeline, group) = self.variant(device, format, lit)?;
        let push = ComposePushConstants { exposure, _pad: [0.0; 3] };
        begin_pass(cmd, "compose", vec![Attachment::new(destination, LoadOp::DontCare)], None)?;
        draw_fullscreen(cmd, &pipeline, &[&group], Some(bytemuck::bytes_of(&push)))?;
        cmd.end_render_pass()
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
