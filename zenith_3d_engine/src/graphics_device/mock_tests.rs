//! Unit tests for the recording mock device.

use super::*;
use crate::graphics_device::{
    Attachment, LoadOp, ClearValue, TextureFormat, TextureUsage,
    VertexInput, CullMode,
};

fn buffer(device: &MockGraphicsDevice, label: &str, size: u64) -> Arc<dyn Buffer> {
    device.create_buffer(BufferDesc {
        label: label.to_string(),
        size,
        usage: BufferUsage::Storage,
    }).unwrap()
}

fn target(device: &MockGraphicsDevice, label: &str, mips: u32, layers: u32) -> Arc<dyn Texture> {
    device.create_texture(TextureDesc {
        label: label.to_string(),
        width: 64,
        height: 32,
        format: TextureFormat::R16G16B16A16_SFLOAT,
        usage: TextureUsage::SampledAndRenderTarget,
        mip_levels: mips,
        array_layers: layers,
    }).unwrap()
}

fn pipeline(device: &MockGraphicsDevice, program: &str) -> Arc<dyn Pipeline> {
    device.create_pipeline(PipelineDesc {
        program: program.to_string(),
        vertex_input: VertexInput::None,
        color_formats: vec![TextureFormat::R16G16B16A16_SFLOAT],
        depth_format: None,
        depth_test: false,
        cull_mode: CullMode::None,
        push_constant_size: 0,
    }).unwrap()
}

fn pass(label: &str, texture: &Arc<dyn Texture>) -> RenderPassDesc {
    RenderPassDesc {
        label: label.to_string(),
        color_attachments: vec![Attachment::new(texture, LoadOp::Clear(ClearValue::Color([0.0; 4])))],
        depth_attachment: None,
    }
}

// ============================================================================
// Buffer Tests
// ============================================================================

#[test]
fn test_buffer_update_and_read() {
    let device = MockGraphicsDevice::new();
    let buf = buffer(&device, "lights", 16);
    buf.update(4, &[1, 2, 3]).unwrap();
    assert_eq!(buf.read(3, 5).unwrap(), vec![0, 1, 2, 3, 0]);
    assert_eq!(buf.size(), 16);
    assert_eq!(buf.label(), "lights");
}

#[test]
fn test_buffer_out_of_range_rejected() {
    let device = MockGraphicsDevice::new();
    let buf = buffer(&device, "small", 8);
    assert!(matches!(buf.update(6, &[0; 4]), Err(Error::InvalidResource(_))));
    assert!(buf.read(0, 9).is_err());
}

#[test]
fn test_zero_sized_buffer_rejected() {
    let device = MockGraphicsDevice::new();
    let result = device.create_buffer(BufferDesc {
        label: "empty".to_string(),
        size: 0,
        usage: BufferUsage::Staging,
    });
    assert!(result.is_err());
    assert_eq!(device.buffers_created(), 0);
}

// ============================================================================
// CommandList Tests
// ============================================================================

#[test]
fn test_copy_buffer_executes_and_records() {
    let device = MockGraphicsDevice::new();
    let staging = buffer(&device, "staging", 8);
    let dst = buffer(&device, "dst", 16);
    staging.update(0, &[9, 8, 7, 6, 5, 4, 3, 2]).unwrap();

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    let regions = [
        BufferCopy { src_offset: 0, dst_offset: 12, size: 4 },
        BufferCopy { src_offset: 4, dst_offset: 0, size: 2 },
    ];
    cmd.copy_buffer(&staging, &dst, &regions).unwrap();
    cmd.end().unwrap();

    assert_eq!(dst.read(12, 4).unwrap(), vec![9, 8, 7, 6]);
    assert_eq!(dst.read(0, 2).unwrap(), vec![5, 4]);
    assert_eq!(device.copies_into("dst"), regions.to_vec());
}

#[test]
fn test_draw_outside_render_pass_fails() {
    let device = MockGraphicsDevice::new();
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    assert!(cmd.draw(3, 1, 0, 0).is_err());
}

#[test]
fn test_copy_inside_render_pass_fails() {
    let device = MockGraphicsDevice::new();
    let color = target(&device, "color", 1, 1);
    let a = buffer(&device, "a", 4);
    let b = buffer(&device, "b", 4);

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.begin_render_pass(&pass("p", &color)).unwrap();
    assert!(cmd.copy_buffer(&a, &b, &[BufferCopy { src_offset: 0, dst_offset: 0, size: 4 }]).is_err());
}

#[test]
fn test_attachment_mip_and_layer_validated() {
    let device = MockGraphicsDevice::new();
    let chain = target(&device, "chain", 3, 2);
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();

    let bad_mip = RenderPassDesc {
        label: "bad".to_string(),
        color_attachments: vec![Attachment::mip(&chain, 3, LoadOp::DontCare)],
        depth_attachment: None,
    };
    assert!(cmd.begin_render_pass(&bad_mip).is_err());

    let good = RenderPassDesc {
        label: "good".to_string(),
        color_attachments: vec![Attachment::layer(&chain, 1, LoadOp::Load)],
        depth_attachment: None,
    };
    cmd.begin_render_pass(&good).unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    match &device.commands()[1] {
        RecordedCommand::BeginRenderPass { label, color, .. } => {
            assert_eq!(label, "good");
            assert_eq!(color[0], ("chain".to_string(), 0, 1));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_pass_draw_count_sums_indirect_records() {
    let device = MockGraphicsDevice::new();
    let color = target(&device, "color", 1, 1);
    let indirect = buffer(&device, "indirect", 100);
    let pipe = pipeline(&device, "opaque");

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.begin_render_pass(&pass("geometry", &color)).unwrap();
    cmd.bind_pipeline(&pipe).unwrap();
    cmd.draw_indexed_indirect(&indirect, 0, 3, 20).unwrap();
    cmd.draw(6, 1, 0, 2).unwrap();
    cmd.end_render_pass().unwrap();
    cmd.begin_render_pass(&pass("lighting", &color)).unwrap();
    cmd.draw(3, 1, 0, 0).unwrap();
    cmd.end_render_pass().unwrap();
    cmd.end().unwrap();

    assert_eq!(device.pass_draw_count("geometry"), 4);
    assert_eq!(device.pass_draw_count("lighting"), 1);
    assert_eq!(device.pass_draw_count("shadow"), 0);
    assert_eq!(device.pass_count("geometry"), 1);
}

#[test]
fn test_indirect_draw_past_buffer_end_fails() {
    let device = MockGraphicsDevice::new();
    let color = target(&device, "color", 1, 1);
    let indirect = buffer(&device, "indirect", 40);

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    cmd.begin_render_pass(&pass("p", &color)).unwrap();
    assert!(cmd.draw_indexed_indirect(&indirect, 0, 3, 20).is_err());
    assert!(cmd.draw_indexed_indirect(&indirect, 0, 2, 20).is_ok());
}

// ============================================================================
// Device Tests
// ============================================================================

#[test]
fn test_texture_binding_writes_recorded() {
    let device = MockGraphicsDevice::new();
    let pipe = pipeline(&device, "terrain");
    let group = device.create_binding_group(&pipe, 1, &[BindingResource::TextureArray { count: 4 }]).unwrap();
    let blend = target(&device, "blend_map", 1, 1);

    device.write_texture_binding(&group, 0, 2, &blend).unwrap();

    assert_eq!(device.texture_writes(), vec![TextureWrite {
        group: "terrain#1".to_string(),
        binding: 0,
        element: 2,
        texture: "blend_map".to_string(),
    }]);
}

#[test]
fn test_binding_missing_mip_rejected() {
    let device = MockGraphicsDevice::new();
    let pipe = pipeline(&device, "downsample");
    let chain = target(&device, "chain", 2, 1);
    assert!(device.create_binding_group(&pipe, 0, &[BindingResource::SampledTextureMip(chain.as_ref(), 1)]).is_ok());
    assert!(device.create_binding_group(&pipe, 0, &[BindingResource::SampledTextureMip(chain.as_ref(), 2)]).is_err());
}

#[test]
fn test_injected_failures_fire_once() {
    let device = MockGraphicsDevice::new();
    let cmd = device.create_command_list().unwrap();

    device.fail_next_submit();
    assert!(matches!(device.submit(&[cmd.as_ref()]), Err(Error::DeviceLost(_))));
    assert!(device.submit(&[cmd.as_ref()]).is_ok());
    assert_eq!(device.submit_count(), 1);

    device.fail_next_wait();
    assert!(device.wait_idle().is_err());
    assert!(device.wait_idle().is_ok());
}
