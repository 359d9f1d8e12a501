use super::*;
use crate::graphics_device::mock::{MockGraphicsDevice, RecordedCommand};

fn setup(initial: u64) -> (Arc<MockGraphicsDevice>, StagedUploader) {
    let device = Arc::new(MockGraphicsDevice::new());
    let uploader = StagedUploader::new(device.clone(), initial).unwrap();
    (device, uploader)
}

fn target(device: &MockGraphicsDevice, label: &str, size: u64) -> Arc<dyn Buffer> {
    device.create_buffer(BufferDesc {
        label: label.to_string(),
        size,
        usage: BufferUsage::Storage,
    }).unwrap()
}

#[test]
fn test_stage_returns_aligned_ranges() {
    let (device, mut uploader) = setup(256);
    let dst = target(&device, "lights", 256);

    let a = uploader.stage(&dst, 64, &[1; 10]).unwrap();
    let b = uploader.stage(&dst, 0, &[2; 4]).unwrap();

    assert_eq!(a, CopyRange { staging_offset: 0, dst_offset: 64, size: 10 });
    assert_eq!(b, CopyRange { staging_offset: 16, dst_offset: 0, size: 4 });
    assert_eq!(uploader.pending_bytes(), 14);
    assert_eq!(uploader.pending_ranges_for(&dst), 2);
}

#[test]
fn test_stage_past_destination_end_fails() {
    let (device, mut uploader) = setup(256);
    let dst = target(&device, "small", 32);
    assert!(uploader.stage(&dst, 30, &[0; 4]).is_err());
    assert!(uploader.is_empty());
}

#[test]
fn test_flush_writes_destinations() {
    let (device, mut uploader) = setup(256);
    let lights = target(&device, "lights", 64);
    let waters = target(&device, "waters", 64);
    uploader.stage(&lights, 8, &[7, 7]).unwrap();
    uploader.stage(&waters, 0, &[9]).unwrap();
    uploader.stage(&lights, 0, &[5]).unwrap();

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    let stats = uploader.flush(cmd.as_mut()).unwrap();

    assert_eq!(stats.ranges, 3);
    assert_eq!(stats.bytes, 4);
    assert_eq!(stats.destinations.len(), 2);
    assert_eq!(lights.read(0, 10).unwrap(), vec![5, 0, 0, 0, 0, 0, 0, 0, 7, 7]);
    assert_eq!(waters.read(0, 1).unwrap(), vec![9]);

    let copies: Vec<_> = device.commands().into_iter()
        .filter(|c| matches!(c, RecordedCommand::CopyBuffer { .. }))
        .collect();
    assert_eq!(copies.len(), 2, "one copy_buffer per destination");
    assert!(uploader.is_empty());
}

#[test]
fn test_empty_flush_records_nothing() {
    let (device, mut uploader) = setup(64);
    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    device.clear_commands();

    let stats = uploader.flush(cmd.as_mut()).unwrap();

    assert_eq!(stats.ranges, 0);
    assert!(device.commands().is_empty());
}

#[test]
fn test_staging_grows_to_power_of_two() {
    let (device, mut uploader) = setup(64);
    let dst = target(&device, "bones", 4096);
    uploader.stage(&dst, 0, &[1; 100]).unwrap();
    uploader.stage(&dst, 1000, &[2; 100]).unwrap();

    let mut cmd = device.create_command_list().unwrap();
    cmd.begin().unwrap();
    uploader.flush(cmd.as_mut()).unwrap();

    // 100 bytes, padded to 112, + 100 = 212 → 256
    assert_eq!(uploader.staging_capacity(), 256);
    assert_eq!(dst.read(1000, 100).unwrap(), vec![2; 100]);
}

#[test]
fn test_discard_drops_pending() {
    let (device, mut uploader) = setup(64);
    let dst = target(&device, "lights", 64);
    uploader.stage(&dst, 0, &[1; 8]).unwrap();
    uploader.discard();
    assert_eq!(uploader.pending_ranges(), 0);
    assert_eq!(uploader.pending_bytes(), 0);
}
