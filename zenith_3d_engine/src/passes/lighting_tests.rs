//! Unit tests for LightingPass.

use super::*;
use glam::{Mat4, Vec3};
use crate::config::{Capacities, EngineConfig};
use crate::graphics_device::mock::{MockGraphicsDevice, RecordedCommand};
use crate::scene::{Fog, Light, LightKind};
use crate::sync::StagedUploader;

struct Fixture {
    device: Arc<MockGraphicsDevice>,
    sync: SceneSynchronizer,
    gbuffer: GBuffer,
    shadow: ShadowPass,
    environment: EnvironmentUpdater,
    pass: LightingPass,
}

fn fixture() -> Fixture {
    let device = Arc::new(MockGraphicsDevice::new());
    let config = EngineConfig {
        capacities: Capacities {
            lights: 4,
            static_instances: 1,
            animated_instances: 1,
            terrains: 1,
            waters: 1,
            shadow_casters: 1,
        },
        environment_resolution: 16,
        environment_mip_levels: 3,
        shadow_atlas_resolution: 64,
        ..EngineConfig::default()
    };
    let sync = SceneSynchronizer::new(device.as_ref(), &config).unwrap();
    let gbuffer = GBuffer::new(device.as_ref(), 200, 100).unwrap();
    let shadow = ShadowPass::new(device.as_ref(), &config, &sync).unwrap();
    let environment = EnvironmentUpdater::new(device.as_ref(), &config).unwrap();
    let pass = LightingPass::new(device.as_ref(), &gbuffer, &sync, &shadow, &environment).unwrap();
    Fixture { device, sync, gbuffer, shadow, environment, pass }
}

#[test]
fn test_push_constant_block_is_128_bytes() {
    assert_eq!(std::mem::size_of::<LightingPushConstants>(), 128);
}

#[test]
fn test_lit_target_matches_gbuffer() {
    let f = fixture();
    let info = f.pass.lit().info();
    assert_eq!((info.width, info.height), (200, 100));
    assert_eq!(info.format, TextureFormat::R16G16B16A16_SFLOAT);
}

#[test]
fn test_zero_lights_still_draws_fullscreen_triangle() {
    let f = fixture();
    let scene = Scene::new();
    let push = LightingPushConstants::new(&scene, &Camera::default(), &f.sync, f.environment.mip_count(), 80.0);
    assert_eq!(push.light_count, 0);

    let mut cmd = f.device.create_command_list().unwrap();
    cmd.begin().unwrap();
    f.pass.record(cmd.as_mut(), &push).unwrap();
    cmd.end().unwrap();

    assert_eq!(f.device.pass_draw_count("lighting"), 1);
    let draw = f.device.commands().into_iter().find(|c| matches!(c, RecordedCommand::Draw { .. }));
    assert_eq!(draw, Some(RecordedCommand::Draw {
        vertex_count: 3, instance_count: 1, first_vertex: 0, first_instance: 0,
    }));
}

#[test]
fn test_push_constants_carry_scene_state() {
    let mut f = fixture();
    let mut scene = Scene::new();
    let node = scene.create_node(Mat4::IDENTITY, None).unwrap();
    scene.add_light(Light::new(node, LightKind::Point { range: 5.0 }));
    scene.add_light(Light::new(node, LightKind::Directional));
    scene.set_ambient(Vec3::new(0.1, 0.2, 0.3));
    scene.set_fog(Fog { color: Vec3::ONE, density: 0.02, height_falloff: 0.5 });
    let mut uploader = StagedUploader::new(f.device.clone(), 256).unwrap();
    f.sync.sync(&mut scene, &mut uploader).unwrap();

    let push = LightingPushConstants::new(&scene, &Camera::default(), &f.sync, f.environment.mip_count(), 40.0);

    assert_eq!(push.light_count, 2);
    assert_eq!(push.light_slots, 2);
    assert_eq!(push.ambient, [0.1, 0.2, 0.3, 3.0]);
    assert_eq!(push.fog, [1.0, 1.0, 1.0, 0.02]);
    assert_eq!(push.camera_position[3], 0.5);
    assert_eq!(push.esm_exponent, 40.0);
}

#[test]
fn test_resize_recreates_lit_target() {
    let mut f = fixture();
    f.gbuffer = GBuffer::new(f.device.as_ref(), 40, 30).unwrap();
    f.pass.resize(f.device.as_ref(), &f.gbuffer, &f.sync, &f.shadow, &f.environment).unwrap();
    assert_eq!(f.pass.lit().info().width, 40);
    assert_eq!(f.pass.lit().info().height, 30);
}
