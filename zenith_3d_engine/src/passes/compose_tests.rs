//! Unit tests for ComposePass.

use super::*;
use crate::graphics_device::{TextureDesc, TextureUsage};
use crate::graphics_device::mock::{MockGraphicsDevice, RecordedCommand};

fn texture(device: &MockGraphicsDevice, label: &str, format: TextureFormat) -> Arc<dyn Texture> {
    device.create_texture(TextureDesc {
        label: label.to_string(),
        width: 64,
        height: 64,
        format,
        usage: TextureUsage::SampledAndRenderTarget,
        mip_levels: 1,
        array_layers: 1,
    }).unwrap()
}

fn compose(device: &MockGraphicsDevice, pass: &mut ComposePass, lit: &Arc<dyn Texture>, dst: &Arc<dyn Texture>) -> Result<()> {
    let mut cmd = device.create_command_list()?;
    cmd.begin()?;
    pass.record(device, cmd.as_mut(), lit, dst, 1.5)?;
    cmd.end()
}

#[test]
fn test_compose_writes_destination_with_exposure() {
    let device = MockGraphicsDevice::new();
    let lit = texture(&device, "lit", TextureFormat::R16G16B16A16_SFLOAT);
    let swap = texture(&device, "swapchain", TextureFormat::B8G8R8A8_SRGB);
    let mut pass = ComposePass::new();

    compose(&device, &mut pass, &lit, &swap).unwrap();

    assert_eq!(device.pass_draw_count("compose"), 1);
    let push = device.commands().into_iter().find_map(|c| match c {
        RecordedCommand::PushConstants { data, .. } => Some(data),
        _ => None,
    }).unwrap();
    let push: ComposePushConstants = bytemuck::pod_read_unaligned(&push);
    assert_eq!(push.exposure, 1.5);
    let target = device.commands().into_iter().find_map(|c| match c {
        RecordedCommand::BeginRenderPass { color, .. } => Some(color[0].0.clone()),
        _ => None,
    });
    assert_eq!(target.as_deref(), Some("swapchain"));
}

#[test]
fn test_pipeline_created_once_per_format() {
    let device = MockGraphicsDevice::new();
    let lit = texture(&device, "lit", TextureFormat::R16G16B16A16_SFLOAT);
    let a = texture(&device, "a", TextureFormat::B8G8R8A8_SRGB);
    let b = texture(&device, "b", TextureFormat::R8G8B8A8_UNORM);
    let mut pass = ComposePass::new();

    compose(&device, &mut pass, &lit, &a).unwrap();
    compose(&device, &mut pass, &lit, &a).unwrap();
    assert_eq!(device.pipelines_created(), 1);

    compose(&device, &mut pass, &lit, &b).unwrap();
    assert_eq!(device.pipelines_created(), 2);
}

#[test]
fn test_depth_destination_rejected() {
    let device = MockGraphicsDevice::new();
    let lit = texture(&device, "lit", TextureFormat::R16G16B16A16_SFLOAT);
    let depth = device.create_texture(TextureDesc {
        label: "depth".to_string(),
        width: 64,
        height: 64,
        format: TextureFormat::D32_FLOAT,
        usage: TextureUsage::DepthStencil,
        mip_levels: 1,
        array_layers: 1,
    }).unwrap();
    let mut pass = ComposePass::new();
    assert!(compose(&device, &mut pass, &lit, &depth).is_err());
}
