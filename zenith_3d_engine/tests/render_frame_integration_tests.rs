//! Integration tests for whole-frame rendering
//!
//! These tests drive RenderEngine against the recording device and
//! check what reaches the GPU over several frames.
//! No GPU required.
//!
//! Run with: cargo test --test render_frame_integration_tests

use std::sync::Arc;
use zenith_3d_engine::glam::{Mat4, Vec2, Vec3};
use zenith_3d_engine::zenith3d::{EngineConfig, Capacities, RenderEngine, Error};
use zenith_3d_engine::zenith3d::camera::Camera;
use zenith_3d_engine::zenith3d::device::{
    BufferDesc, BufferUsage, GraphicsDevice, IndexType, Texture, TextureDesc, TextureFormat,
    TextureUsage,
};
use zenith_3d_engine::zenith3d::device::mock::{MockGraphicsDevice, RecordedCommand};
use zenith_3d_engine::zenith3d::draw::unpack_tag;
use zenith_3d_engine::zenith3d::passes::GeometryBuffers;
use zenith_3d_engine::zenith3d::scene::{
    GeometrySubrange, Light, LightFlags, LightKind, Model, ModelInstance, Scene, SkyVariant,
    Terrain, Water,
};

// ============================================================================
// HELPERS
// ============================================================================

struct Harness {
    device: Arc<MockGraphicsDevice>,
    engine: RenderEngine,
    scene: Scene,
    camera: Camera,
    swapchain: Arc<dyn Texture>,
}

fn harness(capacities: Capacities) -> Harness {
    let device = Arc::new(MockGraphicsDevice::new());
    let buffer = |label: &str, usage: BufferUsage| device.create_buffer(BufferDesc {
        label: label.to_string(),
        size: 1 << 16,
        usage,
    }).unwrap();
    let geometry = GeometryBuffers {
        vertices: buffer("vertices", BufferUsage::Vertex),
        skinned_vertices: buffer("skinned_vertices", BufferUsage::Vertex),
        indices: buffer("indices", BufferUsage::Index),
        index_type: IndexType::U32,
    };
    let config = EngineConfig {
        capacities,
        environment_resolution: 32,
        environment_mip_levels: 4,
        shadow_atlas_resolution: 256,
        render_width: 320,
        render_height: 180,
        ..EngineConfig::default()
    };
    let engine = RenderEngine::new(config, device.clone(), geometry).unwrap();
    let swapchain = device.create_texture(TextureDesc {
        label: "swapchain".to_string(),
        width: 320,
        height: 180,
        format: TextureFormat::B8G8R8A8_SRGB,
        usage: TextureUsage::RenderTarget,
        mip_levels: 1,
        array_layers: 1,
    }).unwrap();
    Harness { device, engine, scene: Scene::new(), camera: Camera::default(), swapchain }
}

fn capacities() -> Capacities {
    Capacities {
        lights: 4,
        static_instances: 8,
        animated_instances: 2,
        terrains: 1,
        waters: 1,
        shadow_casters: 2,
    }
}

fn mesh(label: &str, materials: &[u16]) -> Arc<Model> {
    Arc::new(Model::new(label, materials.iter().enumerate()
        .map(|(i, &material_slot)| GeometrySubrange {
            index_count: 6,
            first_index: i as u32 * 6,
            vertex_offset: 0,
            material_slot,
        })
        .collect()))
}

impl Harness {
    fn frame(&mut self) -> zenith_3d_engine::zenith3d::FrameStats {
        self.engine.render_frame(&mut self.scene, &self.camera, &self.swapchain).unwrap()
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_integration_full_scene_frame() {
    let mut h = harness(capacities());
    let root = h.scene.create_node(Mat4::IDENTITY, None).unwrap();
    let child = h.scene.create_node(Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0)), Some(root)).unwrap();

    h.scene.add_instance(ModelInstance::new(root, mesh("crate", &[0, 1])));
    h.scene.add_instance(ModelInstance::animated(child, Arc::new(Model::skinned("hero", vec![GeometrySubrange {
        index_count: 300,
        first_index: 0,
        vertex_offset: 0,
        material_slot: 2,
    }])), 16));
    h.scene.add_terrain(Terrain::new(Vec3::ZERO, 2, 2, 16));
    h.scene.add_water(Water::new(Vec3::new(0.0, -1.0, 0.0), Vec2::splat(50.0), 32));
    let sun = h.scene.add_light(Light::new(root, LightKind::Directional)
        .with_flags(LightFlags::ENABLED | LightFlags::CAST_SHADOW));
    h.scene.set_sun(Some(sun)).unwrap();
    h.scene.set_sky(SkyVariant::Procedural { turbidity: 2.0, sun_intensity: 20.0, rayleigh: 1.0, mie: 0.005 });

    let stats = h.frame();

    assert_eq!(stats.static_draws, 2);
    assert_eq!(stats.animated_draws, 1);
    assert_eq!(stats.terrain_draws, 1);
    assert_eq!(stats.water_draws, 1);
    assert_eq!(stats.shadow_casters, 1);
    assert_eq!(stats.tables_rebuilt, 2);
    assert!(stats.environment_regenerated);
    assert_eq!(stats.entities_dropped, 0);
    assert_eq!(h.device.pass_draw_count("lighting"), 1);
    assert_eq!(h.device.pass_draw_count("compose"), 1);
    assert_eq!(h.device.submit_count(), 1);
}

#[test]
fn test_integration_steady_state_is_cheap() {
    let mut h = harness(capacities());
    let node = h.scene.create_node(Mat4::IDENTITY, None).unwrap();
    h.scene.add_instance(ModelInstance::new(node, mesh("rock", &[3])));
    h.scene.add_light(Light::new(node, LightKind::Point { range: 5.0 })
        .with_flags(LightFlags::ENABLED | LightFlags::CAST_SHADOW));
    h.frame();
    h.device.clear_commands();

    let stats = h.frame();

    assert_eq!(stats.records_uploaded, 0);
    assert_eq!(stats.tables_rebuilt, 0);
    assert_eq!(stats.shadow_matrices_recomputed, 0);
    assert!(!stats.environment_regenerated);
    assert_eq!(h.device.pass_count("environment_base"), 0);
    // The point caster still renders into its atlas layer
    assert_eq!(h.device.pass_count("shadow"), 1);
    assert_eq!(h.device.pass_count("fallback_init"), 0);
}

#[test]
fn test_integration_removal_recycles_slot_and_regroups_draws() {
    let mut h = harness(capacities());
    let node = h.scene.create_node(Mat4::IDENTITY, None).unwrap();
    let first = h.scene.add_instance(ModelInstance::new(node, mesh("a", &[0])));
    h.scene.add_instance(ModelInstance::new(node, mesh("b", &[1])));
    h.frame();

    h.scene.remove_instance(first).unwrap();
    let stats = h.frame();
    assert_eq!(stats.tables_rebuilt, 1);
    assert_eq!(stats.static_draws, 1);

    // The freed slot 0 is reused by the next instance
    h.scene.add_instance(ModelInstance::new(node, mesh("c", &[5])));
    h.frame();
    let tags: Vec<(u32, u16)> = h.engine.static_table().commands().iter()
        .map(|c| unpack_tag(c.first_instance))
        .collect();
    assert_eq!(tags, vec![(0, 5), (1, 1)]);
}

#[test]
fn test_integration_full_pool_drops_extra_lights() {
    let mut h = harness(Capacities { lights: 2, ..capacities() });
    let node = h.scene.create_node(Mat4::IDENTITY, None).unwrap();
    for _ in 0..3 {
        h.scene.add_light(Light::new(node, LightKind::Point { range: 3.0 }));
    }

    let stats = h.frame();

    assert_eq!(stats.entities_dropped, 1);
    assert_eq!(h.engine.synchronizer().lights().len(), 2);
    assert_eq!(h.scene.light_count(), 3);
}

#[test]
fn test_integration_sky_change_regenerates_environment() {
    let mut h = harness(capacities());
    h.frame();
    assert!(!h.frame().environment_regenerated);

    h.scene.set_sky(SkyVariant::Flat { color: Vec3::new(0.2, 0.3, 0.8) });
    h.device.clear_commands();
    let stats = h.frame();

    assert!(stats.environment_regenerated);
    assert_eq!(h.engine.environment().regenerations(), 2);
    assert_eq!(h.device.pass_count("environment_base"), 1);
}

#[test]
fn test_integration_depth_destination_is_rejected() {
    let mut h = harness(capacities());
    let depth = h.device.create_texture(TextureDesc {
        label: "not_a_color_target".to_string(),
        width: 320,
        height: 180,
        format: TextureFormat::D32_FLOAT,
        usage: TextureUsage::DepthStencil,
        mip_levels: 1,
        array_layers: 1,
    }).unwrap();

    let result = h.engine.render_frame(&mut h.scene, &h.camera, &depth);

    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(h.device.submit_count(), 0);
    assert_eq!(h.scene.frame(), 1);

    // The engine stays usable with a valid destination
    h.frame();
    assert_eq!(h.device.submit_count(), 1);
}

#[test]
fn test_integration_indirect_draws_reference_table_buffers() {
    let mut h = harness(capacities());
    let node = h.scene.create_node(Mat4::IDENTITY, None).unwrap();
    h.scene.add_instance(ModelInstance::new(node, mesh("tile", &[0, 1, 2])));

    h.frame();

    let indirect: Vec<(String, u32)> = h.device.commands().into_iter()
        .filter_map(|c| match c {
            RecordedCommand::DrawIndexedIndirect { buffer, draw_count, .. } => Some((buffer, draw_count)),
            _ => None,
        })
        .collect();
    // Geometry pass only: there are no shadow casters
    assert_eq!(indirect, vec![("static_indirect".to_string(), 3)]);
}
