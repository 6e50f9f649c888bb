use super::*;
use crate::graphics_device::mock_graphics_device::{MockArgumentTable, MockGraphicsDevice};
use crate::graphics_device::{ArgumentEntry, Buffer, BufferDesc, BufferUsage, TextureDesc, TextureFormat};

fn vertex_desc() -> ArgumentTableDesc {
    ArgumentTableDesc {
        stage: ShaderStage::Vertex,
        entries: vec![
            ArgumentEntry { kind: BindingKind::UniformBuffer, count: 1 },
            ArgumentEntry { kind: BindingKind::StorageBuffer, count: 2 },
        ],
    }
}

fn buffers(device: &mut MockGraphicsDevice) -> (Arc<dyn Buffer>, Arc<dyn Buffer>, Arc<dyn Buffer>) {
    let mut make = |usage| device.create_buffer(BufferDesc { size: 64, usage }).unwrap();
    (make(BufferUsage::UNIFORM), make(BufferUsage::STORAGE), make(BufferUsage::STORAGE))
}

// ============================================================================
// ENCODE
// ============================================================================

#[test]
fn test_encode_creates_and_writes_table() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let (camera, vertices, indices) = buffers(&mut device);
    let mut encoder = BindingEncoder::new();

    let bindings = vec![
        (0, BindingResource::UniformBuffer(camera.clone())),
        (1, BindingResource::StorageBuffer(vertices.clone())),
        (2, BindingResource::StorageBuffer(indices.clone())),
    ];
    assert!(encoder.encode(&mut device, &vertex_desc(), &bindings).unwrap());

    let table = encoder.table(ShaderStage::Vertex).unwrap();
    let mock = table.as_any().downcast_ref::<MockArgumentTable>().unwrap();
    assert_eq!(mock.slot(0), Some((BindingKind::UniformBuffer, camera.handle())));
    assert_eq!(mock.slot(2), Some((BindingKind::StorageBuffer, indices.handle())));
    assert_eq!(controller.stats().argument_tables_created, 1);
    assert_eq!(encoder.encode_count(), 1);
}

#[test]
fn test_encode_is_idempotent() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let (camera, vertices, indices) = buffers(&mut device);
    let mut encoder = BindingEncoder::new();

    let bindings = vec![
        (2, BindingResource::StorageBuffer(indices)),
        (0, BindingResource::UniformBuffer(camera)),
        (1, BindingResource::StorageBuffer(vertices)),
    ];
    encoder.encode(&mut device, &vertex_desc(), &bindings).unwrap();
    let first = encoder.encoded_bytes(ShaderStage::Vertex).unwrap().to_vec();

    let mut reordered = bindings.clone();
    reordered.reverse();
    assert!(!encoder.encode(&mut device, &vertex_desc(), &reordered).unwrap());

    assert_eq!(encoder.encoded_bytes(ShaderStage::Vertex).unwrap(), first.as_slice());
    assert_eq!(controller.stats().table_writes, 1);
    assert_eq!(encoder.encode_count(), 1);
}

#[test]
fn test_changed_binding_rewrites_same_table() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let (camera, vertices, indices) = buffers(&mut device);
    let mut encoder = BindingEncoder::new();

    encoder
        .encode(&mut device, &vertex_desc(), &[(0, BindingResource::UniformBuffer(camera.clone()))])
        .unwrap();
    let handle = encoder.table(ShaderStage::Vertex).unwrap().as_any()
        .downcast_ref::<MockArgumentTable>().unwrap().handle();

    let rebaked = vec![
        (0, BindingResource::UniformBuffer(camera)),
        (1, BindingResource::StorageBuffer(vertices)),
        (2, BindingResource::StorageBuffer(indices)),
    ];
    assert!(encoder.encode(&mut device, &vertex_desc(), &rebaked).unwrap());

    let table = encoder.table(ShaderStage::Vertex).unwrap();
    assert_eq!(table.as_any().downcast_ref::<MockArgumentTable>().unwrap().handle(), handle);
    assert_eq!(controller.stats().argument_tables_created, 1);
    assert_eq!(controller.stats().table_writes, 2);
}

#[test]
fn test_layout_change_recreates_table() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let texture = device
        .create_texture(TextureDesc { width: 1, height: 1, format: TextureFormat::Rgba8Unorm })
        .unwrap();
    let mut encoder = BindingEncoder::new();

    let small = ArgumentTableDesc {
        stage: ShaderStage::Fragment,
        entries: vec![ArgumentEntry { kind: BindingKind::SampledTexture, count: 2 }],
    };
    let large = ArgumentTableDesc {
        stage: ShaderStage::Fragment,
        entries: vec![ArgumentEntry { kind: BindingKind::SampledTexture, count: 8 }],
    };
    let bindings = vec![(0, BindingResource::SampledTexture(texture))];

    encoder.encode(&mut device, &small, &bindings).unwrap();
    assert!(encoder.encode(&mut device, &large, &bindings).unwrap());

    assert_eq!(controller.stats().argument_tables_created, 2);
    assert_eq!(encoder.table(ShaderStage::Fragment).unwrap().desc(), &large);
}

#[test]
fn test_stages_are_independent() {
    let mut device = MockGraphicsDevice::new();
    let (camera, _, _) = buffers(&mut device);
    let mut encoder = BindingEncoder::new();

    let fragment = ArgumentTableDesc {
        stage: ShaderStage::Fragment,
        entries: vec![ArgumentEntry { kind: BindingKind::SampledTexture, count: 4 }],
    };
    encoder.encode(&mut device, &vertex_desc(), &[(0, BindingResource::UniformBuffer(camera))]).unwrap();
    encoder.encode(&mut device, &fragment, &[]).unwrap();

    assert!(encoder.table(ShaderStage::Vertex).is_some());
    assert_eq!(encoder.encoded_bytes(ShaderStage::Fragment), Some(&[][..]));
    assert_eq!(encoder.encoded_bytes(ShaderStage::Vertex).unwrap().len(), 13);

    encoder.release();
    assert!(encoder.table(ShaderStage::Vertex).is_none());
}

// ============================================================================
// VALIDATION
// ============================================================================

#[test]
fn test_kind_mismatch_is_rejected_before_writing() {
    let mut device = MockGraphicsDevice::new();
    let controller = device.controller();
    let (camera, _, _) = buffers(&mut device);
    let mut encoder = BindingEncoder::new();

    let result = encoder.encode(&mut device, &vertex_desc(), &[(1, BindingResource::UniformBuffer(camera))]);
    assert!(matches!(result, Err(crate::error::Error::InvalidResource(_))));
    assert_eq!(controller.stats().argument_tables_created, 0);
    assert!(encoder.table(ShaderStage::Vertex).is_none());
}

#[test]
fn test_canonical_bytes_layout() {
    let mut device = MockGraphicsDevice::new();
    let (camera, _, _) = buffers(&mut device);
    let bytes = canonical_bytes(&[(7, BindingResource::UniformBuffer(camera.clone()))]);

    let mut expected = 7u32.to_le_bytes().to_vec();
    expected.push(0);
    expected.extend_from_slice(&camera.handle().to_le_bytes());
    assert_eq!(bytes, expected);
}
