use super::*;
use glam::Vec4;
use crate::scene::{LightFlags, NodeKey};

fn node() -> NodeKey {
    slotmap::KeyData::from_ffi(1).into()
}

#[test]
fn test_record_sizes_are_std430_friendly() {
    for size in [
        std::mem::size_of::<GpuLight>(),
        std::mem::size_of::<GpuInstance>(),
        std::mem::size_of::<GpuTerrain>(),
        std::mem::size_of::<GpuWater>(),
        std::mem::size_of::<GpuShadowMatrices>(),
        std::mem::size_of::<GpuCamera>(),
    ] {
        assert_eq!(size % 16, 0, "record size {} is not 16-byte aligned", size);
    }
    assert_eq!(std::mem::size_of::<GpuLight>(), 64);
    assert_eq!(std::mem::size_of::<GpuShadowMatrices>(), 400);
}

#[test]
fn test_spot_light_record() {
    let light = Light::new(node(), LightKind::Spot { range: 12.0, inner_angle: 0.0, outer_angle: std::f32::consts::FRAC_PI_3 })
        .with_color(Vec3::new(1.0, 0.5, 0.25), 3.0)
        .with_flags(LightFlags::ENABLED | LightFlags::CAST_SHADOW);
    let record = GpuLight::new(&light, Vec3::X, Vec3::NEG_Y, Some(2));

    assert_eq!(record.kind, 2);
    assert_eq!(record.range, 12.0);
    assert_eq!(record.shadow_slot, 2);
    assert_eq!(record.cos_inner, 1.0);
    assert!((record.cos_outer - 0.5).abs() < 1e-6);
    assert_eq!(record.flags, 3);
    assert_eq!(record.color, [1.0, 0.5, 0.25]);
}

#[test]
fn test_light_without_caster_slot() {
    let light = Light::new(node(), LightKind::Directional);
    assert_eq!(GpuLight::new(&light, Vec3::ZERO, Vec3::NEG_Z, None).shadow_slot, NO_SHADOW_SLOT);
}

#[test]
fn test_instance_normal_matrix_and_flags() {
    let world = Mat4::from_scale(Vec3::new(2.0, 4.0, 1.0));
    let record = GpuInstance::new(world, true, Some(128));

    assert_eq!(record.flags, INSTANCE_FLAG_VISIBLE | INSTANCE_FLAG_SKINNED);
    assert_eq!(record.bone_offset, 128);
    assert!(Mat4::from_cols_array_2d(&record.normal_matrix)
        .abs_diff_eq(Mat4::from_scale(Vec3::new(0.5, 0.25, 1.0)), 1e-6));

    let hidden = GpuInstance::new(Mat4::IDENTITY, false, None);
    assert_eq!(hidden.flags, 0);
    assert_eq!(hidden.bone_offset, NO_BONES);
}

#[test]
fn test_shadow_matrices_face_count() {
    let faces = [Mat4::IDENTITY; 6];
    assert_eq!(GpuShadowMatrices::new(&faces, 80.0).face_count, 6);
    let single = GpuShadowMatrices::new(&faces[..1], 80.0);
    assert_eq!(single.face_count, 1);
    assert_eq!(single.matrices[1], [[0.0; 4]; 4]);
}

#[test]
fn test_water_record_copies_color() {
    let mut water = Water::new(Vec3::Y, glam::Vec2::new(4.0, 8.0), 32);
    water.color = Vec4::new(0.0, 0.2, 0.4, 1.0);
    let record = GpuWater::from(&water);
    assert_eq!(record.color, [0.0, 0.2, 0.4, 1.0]);
    assert_eq!(record.extent, [4.0, 8.0]);
    assert_eq!(record.resolution, 32);
}
